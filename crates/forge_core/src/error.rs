//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in session bookkeeping.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Session already active: {0}")]
    DuplicateSession(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure delivering an event to a sink.
///
/// Never propagates past the progress stream.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Sink closed")]
    SinkClosed,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}
