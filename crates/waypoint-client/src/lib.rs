//! Client library for the Waypoint service registry.
//!
//! Two halves:
//!
//! * Consumers hold a [`CachingEndpointSet`] which resolves service types to
//!   live endpoints, caches them, load-balances across instances and retries
//!   around dead ones.
//! * Providers hold a [`RegistrationManager`] which advertises their entries
//!   to every configured registry and renews the leases in the background.
//!
//! Registries are plain HTTP services; [`RegistryEndpoint`] speaks their
//! versioned protocol. Anything that can answer a lookup can stand in via
//! the [`RegistryApi`] trait.

pub mod cache;
pub mod endpoint;
pub mod entry;
pub mod error;
mod http;
pub mod registration;
pub mod registry;

pub use cache::{CachingEndpointSet, DEFAULT_REFRESH_PERIOD, DEFAULT_TRIES};
pub use endpoint::{
    supported_endpoint_version, HttpServiceEndpoint, ServiceEndpoint, VersionedUri,
    SUPPORTED_ENDPOINT_VERSIONS,
};
pub use entry::Entry;
pub use error::{ClientError, ClientResult};
pub use registration::{
    RegistrationCallback, RegistrationManager, RegistrationOutcome, DEFAULT_RENEWAL_INTERVAL,
};
pub use registry::{LookupResult, RegistrationAttempt, RegistryApi, RegistryEndpoint};
