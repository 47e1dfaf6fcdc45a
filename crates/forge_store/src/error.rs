//! Error types for artifact storage.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Store request failed: {0}")]
    Network(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Store not configured: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
