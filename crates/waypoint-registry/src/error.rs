//! Error types for the registry server.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Result type alias using [`RegistryError`].
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by the registry API.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Requested entry does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Submitted entry failed validation. Maps field name to its problems.
    #[error("validation failed")]
    Validation(BTreeMap<String, Vec<String>>),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Body for 500 responses.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        match self {
            // Not-found bodies are a bare JSON string.
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(message)).into_response()
            }
            // Validation bodies map each field to its messages.
            Self::Validation(problems) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(problems)).into_response()
            }
            Self::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody { message }),
            )
                .into_response(),
            Self::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: e.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
