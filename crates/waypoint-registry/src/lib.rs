//! Waypoint service registry server.
//!
//! Services register entries (type, uri, version) and keep them alive by
//! re-registering on an interval; the registry drops any entry whose lease
//! lapses. Consumers resolve service types to live entries through the
//! versioned HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod store;
pub mod sweep;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::AppState;
use crate::config::RegistryConfig;
use crate::error::RegistryResult;
use crate::store::{EntryStore, MemoryStore};

/// Run the registry server until `cancel` fires.
///
/// Binds the API socket, starts the lease expiry sweeper and serves until
/// shutdown.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the server fails.
pub async fn run(config: RegistryConfig, cancel: CancellationToken) -> RegistryResult<()> {
    let store: Arc<dyn EntryStore> = Arc::new(MemoryStore::new());

    sweep::spawn(
        Arc::clone(&store),
        config.lease.lease_time,
        config.lease.expiry_interval,
        cancel.clone(),
    );

    let app = api::router(AppState { store });

    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    info!(listen = %config.server.listen, "registry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("registry shutdown complete");
    Ok(())
}
