//! Entry storage.

mod memory;

pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryResult;

/// A registered entry as held by the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEntry {
    /// Server-assigned id.
    pub id: u64,
    /// Service type this entry advertises.
    pub type_name: String,
    /// Human-readable description.
    pub description: String,
    /// Base uri of the service, with trailing slash.
    pub uri: String,
    /// Protocol version served at the uri.
    pub version: String,
    /// When the entry was first registered.
    pub created_at: DateTime<Utc>,
    /// When the entry was last registered or renewed. Drives lease expiry.
    pub updated_at: DateTime<Utc>,
}

impl StoredEntry {
    /// True if `other` names the same service instance: same uri (after
    /// normalization), version and type.
    #[must_use]
    pub fn same_instance(&self, other: &NewEntry) -> bool {
        self.uri == with_trailing_slash(&other.uri)
            && self.version == other.version
            && self.type_name == other.type_name
    }
}

/// An entry as submitted for registration.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    /// Service type this entry advertises.
    #[serde(default)]
    pub type_name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Base uri of the service.
    #[serde(default)]
    pub uri: String,
    /// Protocol version served at the uri.
    #[serde(default)]
    pub version: String,
}

/// Give `uri` a trailing slash if it lacks one.
#[must_use]
pub fn with_trailing_slash(uri: &str) -> String {
    if uri.ends_with('/') {
        uri.to_owned()
    } else {
        format!("{uri}/")
    }
}

/// Storage backend for registry entries.
///
/// [`MemoryStore`] is the only implementation today; the trait keeps the API
/// layer independent of it.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// All entries, in unspecified order.
    async fn all(&self) -> RegistryResult<Vec<StoredEntry>>;

    /// All entries of `type_name`.
    async fn find_by_type(&self, type_name: &str) -> RegistryResult<Vec<StoredEntry>>;

    /// Register `entry`, or renew it if an entry with the same uri, version
    /// and type already exists. Renewal advances `updated_at` and refreshes
    /// the description; identity fields never change.
    async fn register_or_renew(&self, entry: NewEntry) -> RegistryResult<StoredEntry>;

    /// Remove the entry with `id`, returning it, or `None` if absent.
    async fn delete(&self, id: u64) -> RegistryResult<Option<StoredEntry>>;

    /// Remove every entry whose `updated_at` is older than `lease_time` ago.
    /// Returns the removed entries.
    async fn delete_expired(&self, lease_time: Duration) -> RegistryResult<Vec<StoredEntry>>;
}
