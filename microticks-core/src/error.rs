//! Error types for microticks-core

use thiserror::Error;

/// Main error type for the microticks-core library
#[derive(Error, Debug)]
pub enum Error {
    /// A dispatched request failed at the transport level
    #[error("transport failure: {0}")]
    Transport(#[from] TransportFailure),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The request was discarded before it produced an outcome
    #[error("request dropped before completion")]
    Dropped,
}

/// Details of a failed dispatch.
///
/// `status == 0` means the request never produced an HTTP response
/// (connection refused, DNS failure and the like). Otherwise `status`
/// and `status_text` carry the HTTP status line and `body` the raw
/// response text.
#[derive(Error, Debug, Clone)]
#[error("status='{status} {status_text}', response='{body}'")]
pub struct TransportFailure {
    /// HTTP status code, or 0 when no response was received
    pub status: u16,
    /// HTTP reason phrase, or a short description of the connection error
    pub status_text: String,
    /// Raw response body, or the underlying error message
    pub body: String,
}

impl TransportFailure {
    /// Failure for a request that never reached the HTTP layer.
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self {
            status: 0,
            status_text: "network error".to_string(),
            body: err.to_string(),
        }
    }
}

/// Result type alias for microticks-core
pub type Result<T> = std::result::Result<T, Error>;
