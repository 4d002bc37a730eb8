//! HTTP API for the registry.
//!
//! The lease protocol lives under `/v1`:
//! - `GET /v1/entries` — every registered entry
//! - `POST /v1/entries` — register or renew an entry
//! - `GET /v1/entries/{type_name}` — entries of one service type
//! - `DELETE /v1/entries/{id}` — remove an entry
//! - `GET /v1/ping` — liveness check for clients
//!
//! `/health` sits outside the versioned prefix for infrastructure probes.

mod entries;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::store::EntryStore;

/// Shared application state for the registry.
#[derive(Clone)]
pub struct AppState {
    /// Entry storage.
    pub store: Arc<dyn EntryStore>,
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/entries",
            get(entries::list_entries).post(entries::register_entry),
        )
        .route(
            "/v1/entries/{selector}",
            get(entries::entries_by_type).delete(entries::delete_entry),
        )
        .route("/v1/ping", get(ping))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Liveness check. The exact body is part of the client protocol.
async fn ping() -> &'static str {
    "Success"
}

/// Health check endpoint.
async fn health_check() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse { status: "healthy" })
}

/// Health response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}
