//! Keeping local advertisements alive against a set of registries.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::endpoint::supported_endpoint_version;
use crate::entry::Entry;
use crate::error::{ClientError, ClientResult};
use crate::registry::{LookupResult, RegistrationAttempt, RegistryApi};

/// Default interval between lease renewals.
pub const DEFAULT_RENEWAL_INTERVAL: Duration = Duration::from_secs(30);

/// Per-endpoint registration report passed to a registration callback.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    /// Versioned address of the registry contacted.
    pub endpoint: String,
    /// Server-assigned id, on success.
    pub id: Option<u64>,
    /// Whether this registry accepted the registration.
    pub success: bool,
    /// Status or error message.
    pub message: String,
}

/// Callback invoked once per registry endpoint for every registration and
/// renewal of an entry.
pub type RegistrationCallback = Arc<dyn Fn(&RegistrationOutcome) + Send + Sync>;

struct ManagerState {
    /// Registry endpoints every entry is registered with. Set semantics by
    /// versioned address.
    endpoints: Vec<Arc<dyn RegistryApi>>,
    /// Entries currently kept alive, with their optional callbacks.
    entries: HashMap<Entry, Option<RegistrationCallback>>,
    renewal_started: bool,
}

/// Registers entries with every configured registry and renews them on a
/// fixed interval for the lifetime of the manager.
///
/// One long-lived manager per process is the intended usage. The renewal
/// task starts lazily with the first successful registration and runs until
/// [`shutdown`](Self::shutdown).
pub struct RegistrationManager {
    state: Arc<Mutex<ManagerState>>,
    renewal_interval: Duration,
    cancel: CancellationToken,
}

impl Default for RegistrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationManager {
    /// Create a manager with the default renewal interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_renewal_interval(DEFAULT_RENEWAL_INTERVAL)
    }

    /// Create a manager renewing every `renewal_interval`.
    #[must_use]
    pub fn with_renewal_interval(renewal_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManagerState {
                endpoints: Vec::new(),
                entries: HashMap::new(),
                renewal_started: false,
            })),
            renewal_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Add a registry endpoint that all entries are registered with.
    ///
    /// Idempotent by versioned address.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnsupportedEndpointVersion`] if the endpoint's
    /// protocol version is not supported.
    pub async fn configure_endpoint(&self, endpoint: Arc<dyn RegistryApi>) -> ClientResult<()> {
        let version = endpoint.address().version();
        if !supported_endpoint_version(version) {
            return Err(ClientError::UnsupportedEndpointVersion(version.to_owned()));
        }

        let mut state = self.state.lock().await;
        if !state
            .endpoints
            .iter()
            .any(|e| e.address() == endpoint.address())
        {
            state.endpoints.push(endpoint);
        }
        Ok(())
    }

    /// The number of configured registry endpoints.
    pub async fn endpoint_count(&self) -> usize {
        self.state.lock().await.endpoints.len()
    }

    /// Register `entry` with every configured registry and keep it alive.
    ///
    /// An entry failing local validation is registered with nobody: the
    /// problems are logged and an empty result is returned. A valid entry
    /// is tracked for renewal (starting the shared renewal task on the
    /// first registration) and registered immediately against every
    /// endpoint. The optional `callback` is invoked once per endpoint, now
    /// and on every renewal; a panicking callback is caught and logged so
    /// it cannot kill the renewal task.
    ///
    /// Returns the entry representations created by the registries that
    /// accepted the registration, each carrying its server-assigned id.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoEndpointConfigured`] if no registries are
    /// configured.
    pub async fn register(
        &self,
        entry: Entry,
        callback: Option<RegistrationCallback>,
    ) -> ClientResult<Vec<Entry>> {
        let endpoints = {
            let mut state = self.state.lock().await;
            if state.endpoints.is_empty() {
                return Err(ClientError::NoEndpointConfigured);
            }

            if let Err(e) = entry.validate() {
                warn!(entry = %entry, error = %e, "entry failed validation, not registering");
                return Ok(Vec::new());
            }

            state.entries.insert(entry.clone(), callback.clone());

            if !state.renewal_started {
                state.renewal_started = true;
                self.spawn_renewal_task();
            }

            state.endpoints.clone()
        };

        // Registration I/O runs with the lock released so concurrent calls
        // are not held up behind slow registries.
        Ok(register_with_all(&endpoints, &entry, callback.as_ref()).await)
    }

    /// Look up entries of `type_name` with exactly `version` across every
    /// configured registry.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoEndpointConfigured`] if no registries are
    /// configured.
    pub async fn lookup(&self, type_name: &str, version: &str) -> ClientResult<Vec<LookupResult>> {
        let endpoints = {
            let state = self.state.lock().await;
            if state.endpoints.is_empty() {
                return Err(ClientError::NoEndpointConfigured);
            }
            state.endpoints.clone()
        };

        let mut matches = Vec::new();
        for endpoint in &endpoints {
            for result in endpoint.lookup(type_name).await {
                if result
                    .entry
                    .as_ref()
                    .is_some_and(|e| e.version == version)
                {
                    matches.push(result);
                }
            }
        }
        Ok(matches)
    }

    /// Stop the renewal task. Entries already registered remain on the
    /// registries until their leases lapse.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn spawn_renewal_task(&self) {
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let interval = self.renewal_interval;

        info!(interval = ?interval, "starting lease renewal task");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so renewals
            // start one interval after registration.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("lease renewal task stopped");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                // Snapshot under the lock, renew without it, so foreground
                // calls never wait on renewal round-trips.
                let (endpoints, entries) = {
                    let guard = state.lock().await;
                    let entries: Vec<_> = guard
                        .entries
                        .iter()
                        .map(|(entry, callback)| (entry.clone(), callback.clone()))
                        .collect();
                    (guard.endpoints.clone(), entries)
                };

                debug!(entries = entries.len(), "renewing leases");
                for (entry, callback) in entries {
                    register_with_all(&endpoints, &entry, callback.as_ref()).await;
                }
            }
        });
    }
}

impl Drop for RegistrationManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Register `entry` against every endpoint, invoking `callback` per
/// endpoint. Takes snapshots, not the manager state: callers must not hold
/// the manager lock across these round-trips. Returns the representations
/// from registries that accepted the entry.
async fn register_with_all(
    endpoints: &[Arc<dyn RegistryApi>],
    entry: &Entry,
    callback: Option<&RegistrationCallback>,
) -> Vec<Entry> {
    let mut registered = Vec::new();

    for endpoint in endpoints {
        let attempt = endpoint.register(entry).await;
        if !attempt.success {
            warn!(
                endpoint = %attempt.endpoint,
                entry = %entry,
                message = %attempt.message,
                "registration failed"
            );
        }

        let outcome = RegistrationOutcome {
            endpoint: attempt.endpoint,
            id: attempt.id,
            success: attempt.success,
            message: attempt.message,
        };
        notify(callback, &outcome);

        if let Some(representation) = attempt.registered {
            registered.push(representation);
        }
    }

    registered
}

/// Invoke the entry's callback, if any. A panic inside the callback is
/// caught and logged; the renewal task must survive misbehaving consumers.
fn notify(callback: Option<&RegistrationCallback>, outcome: &RegistrationOutcome) {
    let Some(callback) = callback else {
        return;
    };

    if catch_unwind(AssertUnwindSafe(|| callback(outcome))).is_err() {
        warn!(endpoint = %outcome.endpoint, "registration callback panicked");
    }
}
