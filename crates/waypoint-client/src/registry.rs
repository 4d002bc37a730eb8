//! Wire client for Waypoint registry endpoints.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use hyper::Method;

use crate::endpoint::{VersionedUri, REQUEST_TIMEOUT};
use crate::entry::Entry;
use crate::error::{ClientError, ClientResult};
use crate::http;

/// One registry's answer for a single entry during a lookup.
///
/// A registry that failed (bad status, transport error) contributes a single
/// result with `entry: None` and the failure message, rather than aborting
/// the whole lookup.
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// The decoded entry, or `None` if this registry had nothing usable.
    pub entry: Option<Entry>,
    /// Status or error message from the registry.
    pub message: String,
}

/// Outcome of registering one entry against one registry endpoint.
#[derive(Debug, Clone)]
pub struct RegistrationAttempt {
    /// Versioned address of the registry that was contacted.
    pub endpoint: String,
    /// Server-assigned entry id, on success.
    pub id: Option<u64>,
    /// Whether the registration round-trip succeeded.
    pub success: bool,
    /// Status or error message.
    pub message: String,
    /// The entry representation returned by the registry, on success.
    pub registered: Option<Entry>,
}

/// Operations a registry endpoint offers to the client.
///
/// [`RegistryEndpoint`] is the production implementation; tests substitute
/// doubles.
#[async_trait]
pub trait RegistryApi: Send + Sync + fmt::Debug {
    /// The versioned address identifying this registry.
    fn address(&self) -> &VersionedUri;

    /// Fetch all entries of `type_name`. Never fails: per-endpoint errors
    /// become a [`LookupResult`] with `entry: None`.
    async fn lookup(&self, type_name: &str) -> Vec<LookupResult>;

    /// Register or renew `entry` with this registry.
    async fn register(&self, entry: &Entry) -> RegistrationAttempt;
}

/// A Waypoint registry reachable over HTTP.
#[derive(Debug, Clone)]
pub struct RegistryEndpoint {
    address: VersionedUri,
    timeout: Duration,
}

impl RegistryEndpoint {
    /// Create a registry endpoint for `uri` speaking protocol `version`.
    pub fn new(uri: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            address: VersionedUri::new(uri, version),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, rest: &str) -> String {
        format!("{}{rest}", self.address.uri_with_version())
    }

    /// Liveness check against this registry.
    pub async fn ping(&self) -> bool {
        http::ping(self.address.uri_with_version(), self.timeout).await
    }

    /// Remove an entry from this registry by server-assigned id.
    ///
    /// Returns the deleted representation.
    pub async fn delete(&self, id: u64) -> ClientResult<Entry> {
        let url = self.url(&format!("entries/{id}"));
        let response = http::request(Method::DELETE, &url, None, self.timeout).await?;

        if response.status == 404 {
            return Err(ClientError::NotFound(format!("no entry with id {id}")));
        }
        if !response.is_success() {
            return Err(ClientError::Http(format!(
                "DELETE {url} answered {}: {}",
                response.status,
                response.body_text()
            )));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| ClientError::Http(format!("decode deleted entry: {e}")))
    }
}

impl PartialEq for RegistryEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for RegistryEndpoint {}

impl fmt::Display for RegistryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.address.fmt(f)
    }
}

#[async_trait]
impl RegistryApi for RegistryEndpoint {
    fn address(&self) -> &VersionedUri {
        &self.address
    }

    async fn lookup(&self, type_name: &str) -> Vec<LookupResult> {
        let url = self.url(&format!("entries/{type_name}"));

        let response = match http::request(Method::GET, &url, None, self.timeout).await {
            Ok(response) => response,
            Err(e) => {
                return vec![LookupResult {
                    entry: None,
                    message: e.to_string(),
                }]
            }
        };

        if !response.is_success() {
            return vec![LookupResult {
                entry: None,
                message: response.body_text(),
            }];
        }

        match serde_json::from_slice::<Vec<Entry>>(&response.body) {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| LookupResult {
                    entry: Some(entry),
                    message: "OK".to_owned(),
                })
                .collect(),
            Err(e) => vec![LookupResult {
                entry: None,
                message: format!("decode entries: {e}"),
            }],
        }
    }

    async fn register(&self, entry: &Entry) -> RegistrationAttempt {
        let endpoint = self.address.uri_with_version().to_owned();
        let url = self.url("entries");

        let body = match serde_json::to_vec(entry) {
            Ok(body) => body,
            Err(e) => {
                return RegistrationAttempt {
                    endpoint,
                    id: None,
                    success: false,
                    message: format!("encode entry: {e}"),
                    registered: None,
                }
            }
        };

        let response = match http::request(Method::POST, &url, Some(body), self.timeout).await {
            Ok(response) => response,
            Err(e) => {
                return RegistrationAttempt {
                    endpoint,
                    id: None,
                    success: false,
                    message: e.to_string(),
                    registered: None,
                }
            }
        };

        if !response.is_success() {
            return RegistrationAttempt {
                endpoint,
                id: None,
                success: false,
                message: response.body_text(),
                registered: None,
            };
        }

        match serde_json::from_slice::<Entry>(&response.body) {
            Ok(registered) => RegistrationAttempt {
                endpoint,
                id: registered.id,
                success: true,
                message: "OK".to_owned(),
                registered: Some(registered),
            },
            Err(e) => RegistrationAttempt {
                endpoint,
                id: None,
                success: false,
                message: format!("decode registered entry: {e}"),
                registered: None,
            },
        }
    }
}
