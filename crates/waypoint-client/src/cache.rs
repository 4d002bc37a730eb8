//! Caching, self-healing pool of live service endpoints.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::endpoint::{supported_endpoint_version, ServiceEndpoint};
use crate::error::{ClientError, ClientResult};
use crate::registry::RegistryApi;

/// Default staleness threshold before a cached pool is refreshed.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Default number of attempts for [`CachingEndpointSet::with_endpoint`]
/// (one initial try plus one retry).
pub const DEFAULT_TRIES: usize = 2;

/// Cache key: one logical service to discover.
///
/// Structural equality, so repeated lookups for the same service hit the
/// same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    kind: &'static str,
    type_name: String,
    version: String,
}

impl Key {
    fn new(kind: &'static str, type_name: &str, version: &str) -> Self {
        Self {
            kind,
            type_name: type_name.to_owned(),
            version: version.to_owned(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}({})", self.type_name, self.version, self.kind)
    }
}

/// A cached pool of live endpoints. Never stored with an empty `value`
/// after a successful lookup; an empty pool (post-eviction) is treated as
/// a miss.
struct CacheData<E> {
    value: Vec<Arc<E>>,
    updated_at: Instant,
}

struct CacheState<E> {
    /// Registry endpoints polled during lookups. Set semantics by
    /// versioned address.
    sources: Vec<Arc<dyn RegistryApi>>,
    cache: HashMap<Key, CacheData<E>>,
    /// Keys with a background refresh in flight.
    refreshing: HashSet<Key>,
}

/// A caching wrapper around multiple registry endpoints.
///
/// Services are looked up from every registered registry, pinged to check
/// that they are alive, and then pooled in a cache. Subsequent calls to
/// [`get`](Self::get) return a uniformly random member of the cached pool.
/// Stale pools are refreshed by a background task without blocking readers.
///
/// Callers that observe a dead endpoint should [`evict`](Self::evict) it as
/// soon as possible so other tasks are not handed the same broken endpoint;
/// [`with_endpoint`](Self::with_endpoint) couples the two. A later refresh
/// restores the endpoint if it comes back.
pub struct CachingEndpointSet<E: ServiceEndpoint> {
    state: Arc<Mutex<CacheState<E>>>,
    auto_refresh: bool,
    refresh_period: Duration,
    rng: StdMutex<SmallRng>,
}

impl<E: ServiceEndpoint> Default for CachingEndpointSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ServiceEndpoint> CachingEndpointSet<E> {
    /// Create an empty set with auto-refresh enabled and the default
    /// refresh period.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                sources: Vec::new(),
                cache: HashMap::new(),
                refreshing: HashSet::new(),
            })),
            auto_refresh: true,
            refresh_period: DEFAULT_REFRESH_PERIOD,
            rng: StdMutex::new(SmallRng::from_entropy()),
        }
    }

    /// Disable or enable background staleness refresh.
    #[must_use]
    pub const fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    /// Set the staleness threshold for cached pools.
    #[must_use]
    pub const fn with_refresh_period(mut self, refresh_period: Duration) -> Self {
        self.refresh_period = refresh_period;
        self
    }

    /// The configured staleness threshold.
    pub const fn refresh_period(&self) -> Duration {
        self.refresh_period
    }

    /// Whether stale pools are refreshed in the background.
    pub const fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// Add a registry endpoint to the set polled during lookups.
    ///
    /// Idempotent: an endpoint equal by versioned address to one already
    /// present is not added again.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnsupportedEndpointVersion`] if the endpoint's
    /// protocol version is not supported.
    pub async fn add(&self, source: Arc<dyn RegistryApi>) -> ClientResult<()> {
        let version = source.address().version();
        if !supported_endpoint_version(version) {
            return Err(ClientError::UnsupportedEndpointVersion(version.to_owned()));
        }

        let mut state = self.state.lock().await;
        if !state
            .sources
            .iter()
            .any(|s| s.address() == source.address())
        {
            state.sources.push(source);
        }
        Ok(())
    }

    /// The current number of registered registry endpoints.
    pub async fn size(&self) -> usize {
        self.state.lock().await.sources.len()
    }

    /// Choose at random one live endpoint for `(type_name, version)`.
    ///
    /// On a cache hit the endpoint is returned immediately; if the pool is
    /// stale and auto-refresh is on, a background refresh is kicked off
    /// first (at most one per key). On a miss, a synchronous lookup runs
    /// while holding the cache lock, so concurrent callers wait for the
    /// first lookup instead of piling on.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoEndpointConfigured`] if no registries are
    /// registered; [`ClientError::NotFound`] if no matching service is
    /// alive.
    pub async fn get(&self, type_name: &str, version: &str) -> ClientResult<Arc<E>> {
        let key = Key::new(E::KIND, type_name, version);
        let mut state = self.state.lock().await;

        let hit = matches!(state.cache.get(&key), Some(data) if !data.value.is_empty());
        if hit {
            let stale = state.cache[&key].updated_at.elapsed() > self.refresh_period;
            if self.auto_refresh && stale && state.refreshing.insert(key.clone()) {
                debug!(key = %key, "cache entry stale, refreshing in background");
                self.spawn_refresh(key.clone(), state.sources.clone());
            }
            return Ok(self.sample(&state.cache[&key].value));
        }

        // Cold miss: look up while holding the lock so at most one lookup
        // runs for a brand-new key.
        let sources = state.sources.clone();
        let value = lookup::<E>(&sources, type_name, version).await?;
        let picked = self.sample(&value);
        state.cache.insert(
            key,
            CacheData {
                value,
                updated_at: Instant::now(),
            },
        );
        Ok(picked)
    }

    /// Get an endpoint and pass it to `f`. If `f` fails with a
    /// connection-refused error, the endpoint is evicted and the whole
    /// get-and-call is retried, up to `tries` total attempts. Any other
    /// error propagates immediately; a genuinely missing service is never
    /// masked by retries.
    pub async fn with_endpoint<T, F, Fut>(
        &self,
        type_name: &str,
        version: &str,
        tries: usize,
        f: F,
    ) -> ClientResult<T>
    where
        F: Fn(Arc<E>) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut remain = tries.max(1);

        loop {
            remain -= 1;
            match self.get(type_name, version).await {
                Ok(endpoint) => match f(Arc::clone(&endpoint)).await {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_connection_refused() => {
                        self.evict(&endpoint).await;
                        if remain == 0 {
                            return Err(e);
                        }
                    }
                    Err(e) => return Err(e),
                },
                Err(e) if e.is_connection_refused() => {
                    if remain == 0 {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Remove one endpoint from its cached pool so it is no longer handed
    /// out by [`get`](Self::get). The cache slot itself survives; a later
    /// refresh or cold lookup may restore the endpoint once it responds to
    /// ping again. A no-op if the endpoint is not pooled.
    pub async fn evict(&self, bad_endpoint: &E) {
        let key = Key::new(E::KIND, bad_endpoint.type_name(), bad_endpoint.address().version());
        let mut state = self.state.lock().await;
        if let Some(data) = state.cache.get_mut(&key) {
            data.value
                .retain(|e| e.address() != bad_endpoint.address());
        }
    }

    /// Force a synchronous lookup, overwriting whatever is cached for
    /// `(type_name, version)`.
    pub async fn refresh(&self, type_name: &str, version: &str) -> ClientResult<()> {
        let key = Key::new(E::KIND, type_name, version);
        let mut state = self.state.lock().await;
        let sources = state.sources.clone();
        let value = lookup::<E>(&sources, type_name, version).await?;
        state.cache.insert(
            key,
            CacheData {
                value,
                updated_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Refresh `key` on a background task. The caller must have inserted
    /// `key` into the in-flight set; it is removed here when the task
    /// finishes, success or failure.
    fn spawn_refresh(&self, key: Key, sources: Vec<Arc<dyn RegistryApi>>) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let result = lookup::<E>(&sources, &key.type_name, &key.version).await;
            let mut guard = state.lock().await;
            match result {
                Ok(value) => {
                    guard.cache.insert(
                        key.clone(),
                        CacheData {
                            value,
                            updated_at: Instant::now(),
                        },
                    );
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "background refresh failed");
                }
            }
            guard.refreshing.remove(&key);
        });
    }

    /// Uniform random selection from a non-empty pool.
    fn sample(&self, pool: &[Arc<E>]) -> Arc<E> {
        let index = if pool.len() == 1 {
            0
        } else {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.gen_range(0..pool.len())
        };
        Arc::clone(&pool[index])
    }
}

/// Query every registry for `type_name`, filter to exact `version` matches,
/// instantiate endpoints and keep only those that answer ping.
///
/// Runs without the cache lock held when called from the background path;
/// the cold-miss path calls it while holding the lock deliberately.
async fn lookup<E: ServiceEndpoint>(
    sources: &[Arc<dyn RegistryApi>],
    type_name: &str,
    version: &str,
) -> ClientResult<Vec<Arc<E>>> {
    if sources.is_empty() {
        return Err(ClientError::NoEndpointConfigured);
    }

    let mut results = Vec::new();
    for source in sources {
        results.extend(source.lookup(type_name).await);
    }

    let matching: Vec<_> = results
        .into_iter()
        .filter_map(|r| r.entry)
        .filter(|e| e.version == version)
        .collect();

    if matching.is_empty() {
        let queried: Vec<_> = sources.iter().map(|s| s.address().to_string()).collect();
        return Err(ClientError::NotFound(format!(
            "no {type_name} services available in {}",
            queried.join(",")
        )));
    }

    let mut alive = Vec::new();
    let mut candidates = Vec::new();
    for entry in &matching {
        candidates.push(entry.uri.clone());
        let endpoint = E::from_lookup(type_name, &entry.uri, &entry.version);
        if endpoint.ping().await {
            alive.push(Arc::new(endpoint));
        }
    }

    if alive.is_empty() {
        return Err(ClientError::NotFound(format!(
            "no {type_name} services responded to ping ({})",
            candidates.join(",")
        )));
    }

    Ok(alive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::VersionedUri;
    use crate::entry::Entry;
    use crate::registry::{LookupResult, RegistrationAttempt};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test endpoint whose liveness is encoded in its uri: anything
    /// containing "dead" fails ping.
    #[derive(Debug)]
    struct TestEndpoint {
        type_name: String,
        address: VersionedUri,
    }

    #[async_trait]
    impl ServiceEndpoint for TestEndpoint {
        const KIND: &'static str = "test";

        fn from_lookup(type_name: &str, uri: &str, version: &str) -> Self {
            Self {
                type_name: type_name.to_owned(),
                address: VersionedUri::new(uri, version),
            }
        }

        fn type_name(&self) -> &str {
            &self.type_name
        }

        fn address(&self) -> &VersionedUri {
            &self.address
        }

        async fn ping(&self) -> bool {
            !self.address.uri().contains("dead")
        }
    }

    /// Registry double that answers lookups for a fixed set of entries and
    /// counts how often it is queried.
    #[derive(Debug)]
    struct FakeRegistry {
        address: VersionedUri,
        entries: Vec<Entry>,
        lookups: AtomicUsize,
        delay: Duration,
    }

    impl FakeRegistry {
        fn new(uri: &str, entries: Vec<Entry>) -> Arc<Self> {
            Arc::new(Self {
                address: VersionedUri::new(uri, "1"),
                entries,
                lookups: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn with_version(uri: &str, version: &str) -> Arc<Self> {
            Arc::new(Self {
                address: VersionedUri::new(uri, version),
                entries: Vec::new(),
                lookups: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(uri: &str, entries: Vec<Entry>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                address: VersionedUri::new(uri, "1"),
                entries,
                lookups: AtomicUsize::new(0),
                delay,
            })
        }

        fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RegistryApi for FakeRegistry {
        fn address(&self) -> &VersionedUri {
            &self.address
        }

        async fn lookup(&self, type_name: &str) -> Vec<LookupResult> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let matches: Vec<_> = self
                .entries
                .iter()
                .filter(|e| e.type_name == type_name)
                .cloned()
                .map(|entry| LookupResult {
                    entry: Some(entry),
                    message: "OK".to_owned(),
                })
                .collect();

            if matches.is_empty() {
                vec![LookupResult {
                    entry: None,
                    message: "not found".to_owned(),
                }]
            } else {
                matches
            }
        }

        async fn register(&self, _entry: &Entry) -> RegistrationAttempt {
            unimplemented!("not used by cache tests")
        }
    }

    fn service_entry(type_name: &str, uri: &str) -> Entry {
        Entry::new(type_name, "description", uri, "1")
    }

    fn set() -> CachingEndpointSet<TestEndpoint> {
        CachingEndpointSet::new().with_auto_refresh(false)
    }

    #[tokio::test]
    async fn add_multiple_endpoints() {
        let s = set();
        assert_eq!(s.size().await, 0);
        s.add(FakeRegistry::new("http://one", vec![])).await.unwrap();
        assert_eq!(s.size().await, 1);
        s.add(FakeRegistry::new("http://two", vec![])).await.unwrap();
        s.add(FakeRegistry::new("http://three", vec![]))
            .await
            .unwrap();
        assert_eq!(s.size().await, 3);
    }

    #[tokio::test]
    async fn add_deduplicates_by_address() {
        let s = set();
        for _ in 0..2 {
            s.add(FakeRegistry::new("http://example.com", vec![]))
                .await
                .unwrap();
        }
        assert_eq!(s.size().await, 1);
    }

    #[tokio::test]
    async fn add_rejects_unsupported_version() {
        let s = set();
        let err = s
            .add(FakeRegistry::with_version("http://example.com", "999999"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedEndpointVersion(v) if v == "999999"));
        assert_eq!(s.size().await, 0);
    }

    #[tokio::test]
    async fn get_without_endpoints_fails() {
        let s = set();
        let err = s.get("Foo", "1").await.unwrap_err();
        assert!(matches!(err, ClientError::NoEndpointConfigured));
    }

    #[tokio::test]
    async fn get_returns_registered_service() {
        let s = set();
        s.add(FakeRegistry::new(
            "http://svc-a",
            vec![service_entry("Foo", "http://svc-a")],
        ))
        .await
        .unwrap();

        let endpoint = s.get("Foo", "1").await.unwrap();
        assert_eq!(endpoint.address().uri(), "http://svc-a/");
    }

    #[tokio::test]
    async fn get_from_multiple_registries() {
        let s = set();
        for name in ["a", "b", "c", "d"] {
            let uri = format!("http://{name}");
            s.add(FakeRegistry::new(&uri, vec![service_entry(name, &uri)]))
                .await
                .unwrap();
        }
        assert_eq!(s.size().await, 4);

        for name in ["a", "b", "c", "d"] {
            let endpoint = s.get(name, "1").await.unwrap();
            assert_eq!(endpoint.address().uri(), format!("http://{name}/"));
        }
    }

    #[tokio::test]
    async fn get_serves_from_cache() {
        let s = set();
        let registry =
            FakeRegistry::new("http://reg", vec![service_entry("Foo", "http://svc-a")]);
        s.add(Arc::clone(&registry) as Arc<dyn RegistryApi>)
            .await
            .unwrap();

        let first = s.get("Foo", "1").await.unwrap();
        for _ in 0..10 {
            let again = s.get("Foo", "1").await.unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(registry.lookup_count(), 1);
    }

    #[tokio::test]
    async fn get_filters_by_exact_version() {
        let s = set();
        let mut v2 = service_entry("Foo", "http://svc-a");
        v2.version = "1.1".into();
        s.add(FakeRegistry::new("http://reg", vec![v2])).await.unwrap();

        let err = s.get("Foo", "1").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_skips_endpoints_that_fail_ping() {
        let s = set();
        s.add(FakeRegistry::new(
            "http://reg",
            vec![
                service_entry("Foo", "http://dead-1"),
                service_entry("Foo", "http://live-1"),
            ],
        ))
        .await
        .unwrap();

        for _ in 0..20 {
            let endpoint = s.get("Foo", "1").await.unwrap();
            assert_eq!(endpoint.address().uri(), "http://live-1/");
        }
    }

    #[tokio::test]
    async fn get_fails_when_nothing_pings() {
        let s = set();
        s.add(FakeRegistry::new(
            "http://reg",
            vec![service_entry("Foo", "http://dead-1")],
        ))
        .await
        .unwrap();

        let err = s.get("Foo", "1").await.unwrap_err();
        let ClientError::NotFound(message) = err else {
            panic!("expected NotFound");
        };
        assert!(message.contains("ping"));
        assert!(message.contains("http://dead-1/"));
    }

    #[tokio::test]
    async fn get_distributes_across_pool() {
        let s = set();
        s.add(FakeRegistry::new(
            "http://reg",
            vec![
                service_entry("Foo", "http://a"),
                service_entry("Foo", "http://b"),
                service_entry("Foo", "http://c"),
            ],
        ))
        .await
        .unwrap();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..100 {
            let endpoint = s.get("Foo", "1").await.unwrap();
            *counts.entry(endpoint.address().uri().to_owned()).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for (uri, count) in counts {
            assert!(count > 10, "{uri} returned only {count} times");
        }
    }

    #[tokio::test]
    async fn evict_removes_endpoint_until_next_lookup() {
        let s = set();
        let registry =
            FakeRegistry::new("http://reg", vec![service_entry("Foo", "http://svc-a")]);
        s.add(Arc::clone(&registry) as Arc<dyn RegistryApi>)
            .await
            .unwrap();

        let endpoint = s.get("Foo", "1").await.unwrap();
        s.evict(&endpoint).await;

        // The emptied pool counts as a miss, so the next get re-looks-up.
        let restored = s.get("Foo", "1").await.unwrap();
        assert_eq!(registry.lookup_count(), 2);
        assert_eq!(restored.address(), endpoint.address());
        assert!(!Arc::ptr_eq(&restored, &endpoint));
    }

    #[tokio::test]
    async fn evict_unknown_endpoint_is_noop() {
        let s = set();
        let stranger = TestEndpoint::from_lookup("Foo", "http://nowhere", "1");
        s.evict(&stranger).await;
    }

    #[tokio::test]
    async fn refresh_overwrites_cache() {
        let s = set();
        let registry =
            FakeRegistry::new("http://reg", vec![service_entry("Foo", "http://svc-a")]);
        s.add(Arc::clone(&registry) as Arc<dyn RegistryApi>)
            .await
            .unwrap();

        let before = s.get("Foo", "1").await.unwrap();
        s.refresh("Foo", "1").await.unwrap();
        let after = s.get("Foo", "1").await.unwrap();

        assert_eq!(registry.lookup_count(), 2);
        assert_eq!(before.address(), after.address());
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn stale_entry_is_refreshed_in_background() {
        let s: CachingEndpointSet<TestEndpoint> =
            CachingEndpointSet::new().with_refresh_period(Duration::ZERO);
        let registry =
            FakeRegistry::new("http://reg", vec![service_entry("Foo", "http://svc-a")]);
        s.add(Arc::clone(&registry) as Arc<dyn RegistryApi>)
            .await
            .unwrap();

        s.get("Foo", "1").await.unwrap();
        assert_eq!(registry.lookup_count(), 1);

        // Immediately stale; this get returns the cached value and kicks
        // off one background refresh.
        s.get("Foo", "1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.lookup_count(), 2);
    }

    #[tokio::test]
    async fn at_most_one_background_refresh_per_key() {
        let s: CachingEndpointSet<TestEndpoint> =
            CachingEndpointSet::new().with_refresh_period(Duration::ZERO);
        let registry = FakeRegistry::slow(
            "http://reg",
            vec![service_entry("Foo", "http://svc-a")],
            Duration::from_millis(50),
        );
        s.add(Arc::clone(&registry) as Arc<dyn RegistryApi>)
            .await
            .unwrap();

        s.get("Foo", "1").await.unwrap();

        // All of these observe a stale entry while the first refresh is
        // still sleeping inside the registry double.
        for _ in 0..5 {
            s.get("Foo", "1").await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(registry.lookup_count(), 2);
    }

    #[tokio::test]
    async fn with_endpoint_passes_through_success() {
        let s = set();
        s.add(FakeRegistry::new(
            "http://reg",
            vec![service_entry("Foo", "http://svc-a")],
        ))
        .await
        .unwrap();

        let uri = s
            .with_endpoint("Foo", "1", DEFAULT_TRIES, |endpoint| async move {
                Ok(endpoint.address().uri().to_owned())
            })
            .await
            .unwrap();
        assert_eq!(uri, "http://svc-a/");
    }

    #[tokio::test]
    async fn with_endpoint_evicts_and_retries_on_connection_refused() {
        let s = set();
        let registry =
            FakeRegistry::new("http://reg", vec![service_entry("Foo", "http://svc-a")]);
        s.add(Arc::clone(&registry) as Arc<dyn RegistryApi>)
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let err = s
            .with_endpoint("Foo", "1", DEFAULT_TRIES, |_endpoint| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ClientError::ConnectionRefused("svc-a:80".into())) }
            })
            .await
            .unwrap_err();

        assert!(err.is_connection_refused());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // The eviction after the first failure emptied the pool, forcing a
        // second lookup before the retry.
        assert_eq!(registry.lookup_count(), 2);
    }

    #[tokio::test]
    async fn with_endpoint_does_not_retry_not_found() {
        let s = set();
        s.add(FakeRegistry::new(
            "http://reg",
            vec![service_entry("Foo", "http://svc-a")],
        ))
        .await
        .unwrap();

        let calls = AtomicUsize::new(0);
        let err = s
            .with_endpoint("Foo", "1", DEFAULT_TRIES, |_endpoint| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ClientError::NotFound("gone".into())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::NotFound(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn key_display() {
        let key = Key::new("test", "Foo", "1");
        assert_eq!(key.to_string(), "Foo-v1(test)");
    }

    #[test]
    fn key_structural_equality() {
        let a = Key::new("test", "Foo", "1");
        let b = Key::new("test", "Foo", "1");
        let c = Key::new("test", "Foo", "2");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }
}
