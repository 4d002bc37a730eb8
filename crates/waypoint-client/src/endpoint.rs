//! Endpoint identity and the service endpoint abstraction.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;

use crate::entry::with_trailing_slash;
use crate::http;

/// Registry endpoint protocol versions this client understands.
pub const SUPPORTED_ENDPOINT_VERSIONS: &[&str] = &["1"];

/// Default timeout for outbound HTTP calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// True if `version` names a registry protocol version this client supports.
pub fn supported_endpoint_version(version: &str) -> bool {
    SUPPORTED_ENDPOINT_VERSIONS.contains(&version)
}

/// A normalized URI paired with a protocol version.
///
/// The derived `uri_with_version` (`{uri}v{version}/`, uri given a trailing
/// slash) is the sole identity of an endpoint: equality and hashing use only
/// it, so two values pointing at the same versioned address are
/// interchangeable. Immutable after construction.
#[derive(Debug, Clone)]
pub struct VersionedUri {
    uri: String,
    version: String,
    uri_with_version: String,
}

impl VersionedUri {
    /// Build from a base uri and version. The uri gains a trailing slash if
    /// missing.
    pub fn new(uri: impl Into<String>, version: impl Into<String>) -> Self {
        let uri = with_trailing_slash(&uri.into());
        let version = version.into();
        let uri_with_version = format!("{uri}v{version}/");
        Self {
            uri,
            version,
            uri_with_version,
        }
    }

    /// The base uri, with trailing slash.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The protocol version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The versioned address, `{uri}v{version}/`.
    pub fn uri_with_version(&self) -> &str {
        &self.uri_with_version
    }
}

impl PartialEq for VersionedUri {
    fn eq(&self, other: &Self) -> bool {
        self.uri_with_version == other.uri_with_version
    }
}

impl Eq for VersionedUri {}

impl Hash for VersionedUri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri_with_version.hash(state);
    }
}

impl fmt::Display for VersionedUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri_with_version)
    }
}

/// A reachable instance of a remote service, as handed out by the cache.
///
/// Implementations are the "endpoint class" of a cache key: the cache
/// instantiates one per lookup result and keeps only those whose
/// [`ping`](Self::ping) succeeds. Instances are shared as `Arc` and must be
/// treated as immutable once constructed.
#[async_trait]
pub trait ServiceEndpoint: Send + Sync + Sized + 'static {
    /// Stable name of this endpoint kind, used in cache keys.
    const KIND: &'static str;

    /// Instantiate from a registry lookup result.
    fn from_lookup(type_name: &str, uri: &str, version: &str) -> Self;

    /// The service type this endpoint serves.
    fn type_name(&self) -> &str;

    /// The endpoint's versioned address.
    fn address(&self) -> &VersionedUri;

    /// Lightweight liveness check. A failed ping is an ordinary outcome,
    /// not an error.
    async fn ping(&self) -> bool;
}

/// A plain HTTP service endpoint.
///
/// Pings `GET {uri}v{version}/ping` and treats any 2xx response with body
/// exactly `Success` as alive.
#[derive(Debug, Clone)]
pub struct HttpServiceEndpoint {
    type_name: String,
    address: VersionedUri,
    timeout: Duration,
}

impl HttpServiceEndpoint {
    /// Create an endpoint for `type_name` at `uri`/`version`.
    pub fn new(
        type_name: impl Into<String>,
        uri: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            address: VersionedUri::new(uri, version),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Set the request timeout for liveness checks.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl PartialEq for HttpServiceEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for HttpServiceEndpoint {}

impl fmt::Display for HttpServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name, self.address)
    }
}

#[async_trait]
impl ServiceEndpoint for HttpServiceEndpoint {
    const KIND: &'static str = "http";

    fn from_lookup(type_name: &str, uri: &str, version: &str) -> Self {
        Self::new(type_name, uri, version)
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn address(&self) -> &VersionedUri {
        &self.address
    }

    async fn ping(&self) -> bool {
        http::ping(self.address.uri_with_version(), self.timeout).await
    }
}
