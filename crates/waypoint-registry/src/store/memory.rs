//! In-memory entry store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{RegistryError, RegistryResult};

use super::{with_trailing_slash, EntryStore, NewEntry, StoredEntry};

/// Entry store backed by a `HashMap`. Entries do not survive a restart;
/// clients re-register on their renewal interval, which repopulates the
/// store within one lease period.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<u64, StoredEntry>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn all(&self) -> RegistryResult<Vec<StoredEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RegistryError::internal("entry store lock poisoned"))?;

        Ok(entries.values().cloned().collect())
    }

    async fn find_by_type(&self, type_name: &str) -> RegistryResult<Vec<StoredEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RegistryError::internal("entry store lock poisoned"))?;

        Ok(entries
            .values()
            .filter(|e| e.type_name == type_name)
            .cloned()
            .collect())
    }

    async fn register_or_renew(&self, entry: NewEntry) -> RegistryResult<StoredEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RegistryError::internal("entry store lock poisoned"))?;

        let now = Utc::now();

        if let Some(existing) = entries.values_mut().find(|e| e.same_instance(&entry)) {
            existing.description = entry.description;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = StoredEntry {
            id,
            type_name: entry.type_name,
            description: entry.description,
            uri: with_trailing_slash(&entry.uri),
            version: entry.version,
            created_at: now,
            updated_at: now,
        };
        entries.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: u64) -> RegistryResult<Option<StoredEntry>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RegistryError::internal("entry store lock poisoned"))?;

        Ok(entries.remove(&id))
    }

    async fn delete_expired(&self, lease_time: Duration) -> RegistryResult<Vec<StoredEntry>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RegistryError::internal("entry store lock poisoned"))?;

        let now = Utc::now();
        let expired: Vec<u64> = entries
            .values()
            .filter(|e| {
                now.signed_duration_since(e.updated_at)
                    .to_std()
                    .is_ok_and(|age| age > lease_time)
            })
            .map(|e| e.id)
            .collect();

        Ok(expired
            .into_iter()
            .filter_map(|id| entries.remove(&id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(type_name: &str, uri: &str) -> NewEntry {
        NewEntry {
            type_name: type_name.to_owned(),
            description: "test service".to_owned(),
            uri: uri.to_owned(),
            version: "1".to_owned(),
        }
    }

    #[tokio::test]
    async fn register_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.register_or_renew(entry("Foo", "http://a")).await.unwrap();
        let b = store.register_or_renew(entry("Foo", "http://b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn uri_is_normalized() {
        let store = MemoryStore::new();
        let stored = store.register_or_renew(entry("Foo", "http://a")).await.unwrap();
        assert_eq!(stored.uri, "http://a/");
    }

    #[tokio::test]
    async fn renewal_keeps_id_and_advances_updated_at() {
        let store = MemoryStore::new();
        let first = store.register_or_renew(entry("Foo", "http://a")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        // Same instance even though the submitted uri lacks the slash.
        let mut renewal = entry("Foo", "http://a");
        renewal.description = "updated description".to_owned();
        let second = store.register_or_renew(renewal).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.description, "updated description");
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn different_version_is_a_new_entry() {
        let store = MemoryStore::new();
        store.register_or_renew(entry("Foo", "http://a")).await.unwrap();

        let mut v2 = entry("Foo", "http://a");
        v2.version = "2".to_owned();
        store.register_or_renew(v2).await.unwrap();

        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn find_by_type_filters() {
        let store = MemoryStore::new();
        store.register_or_renew(entry("Foo", "http://a")).await.unwrap();
        store.register_or_renew(entry("Bar", "http://b")).await.unwrap();

        let found = store.find_by_type("Foo").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].type_name, "Foo");
        assert!(store.find_by_type("Baz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_returns_the_entry() {
        let store = MemoryStore::new();
        let stored = store.register_or_renew(entry("Foo", "http://a")).await.unwrap();

        let deleted = store.delete(stored.id).await.unwrap();
        assert_eq!(deleted.unwrap().id, stored.id);
        assert!(store.delete(stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_expired_removes_only_stale_entries() {
        let store = MemoryStore::new();
        store.register_or_renew(entry("Foo", "http://a")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        store.register_or_renew(entry("Bar", "http://b")).await.unwrap();

        let removed = store.delete_expired(Duration::from_millis(5)).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].type_name, "Foo");
        assert_eq!(store.all().await.unwrap().len(), 1);
    }
}
