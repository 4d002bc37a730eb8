//! Background lease expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::store::EntryStore;

/// Spawn the expiry sweeper: every `interval`, remove entries whose lease
/// of `lease_time` has lapsed. Runs until `cancel` fires.
pub fn spawn(
    store: Arc<dyn EntryStore>,
    lease_time: Duration,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    info!(lease_time = ?lease_time, interval = ?interval, "starting lease expiry sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("lease expiry sweeper stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match store.delete_expired(lease_time).await {
                Ok(removed) => {
                    for entry in &removed {
                        info!(
                            id = entry.id,
                            type_name = %entry.type_name,
                            uri = %entry.uri,
                            "lease expired, entry removed"
                        );
                    }
                }
                Err(e) => error!(error = %e, "lease expiry sweep failed"),
            }
        }
    })
}
