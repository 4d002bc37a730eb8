//! Client error types.

use thiserror::Error;

/// Errors surfaced by the Waypoint client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The endpoint speaks a protocol version this client does not support.
    #[error("version {0} endpoints are not supported")]
    UnsupportedEndpointVersion(String),

    /// No registry endpoints have been added or configured.
    #[error("no endpoints have been added")]
    NoEndpointConfigured,

    /// A lookup completed against every registry but found no usable service.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote side refused the connection.
    ///
    /// This is the one failure class [`CachingEndpointSet::with_endpoint`]
    /// retries automatically after evicting the offending endpoint.
    ///
    /// [`CachingEndpointSet::with_endpoint`]: crate::cache::CachingEndpointSet::with_endpoint
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The request did not complete within the configured timeout.
    #[error("request timeout")]
    Timeout,

    /// Any other transport or protocol failure.
    #[error("http error: {0}")]
    Http(String),

    /// The URL could not be parsed into host and port.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// An entry failed local validation before registration.
    #[error("invalid entry: {}", .0.join("; "))]
    InvalidEntry(Vec<String>),

    /// I/O error during communication.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True if this error indicates the remote instance actively refused
    /// the connection, as opposed to being slow or answering with garbage.
    pub fn is_connection_refused(&self) -> bool {
        match self {
            Self::ConnectionRefused(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::ConnectionRefused,
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
