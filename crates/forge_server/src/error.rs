//! Startup and HTTP error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forge_core::CoreError;
use forge_heal::HealError;
use forge_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for server setup.
pub type ServerResult<T> = Result<T, ServerError>;

/// Failures while assembling the service from configuration.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Code generator setup failed: {0}")]
    Generator(#[from] forge_llm::GenerationError),

    #[error("Artifact store setup failed: {0}")]
    Store(#[from] StoreError),
}

/// Error returned by HTTP handlers as `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<HealError> for ApiError {
    fn from(e: HealError) -> Self {
        match e {
            HealError::Session(CoreError::DuplicateSession(id)) => {
                Self::Conflict(format!("Session {} is already running", id))
            }
            HealError::Session(CoreError::InvalidRequest(msg)) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(cid) => Self::NotFound(format!("Artifact not found: {}", cid)),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_map_to_status() {
        let dup: ApiError = HealError::Session(CoreError::DuplicateSession("s1".into())).into();
        assert_eq!(dup.status(), StatusCode::CONFLICT);

        let invalid: ApiError =
            HealError::Session(CoreError::InvalidRequest("Missing required fields: category".into()))
                .into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "Missing required fields: category");
    }

    #[test]
    fn test_unknown_cid_is_not_found() {
        let err: ApiError = StoreError::NotFound("bafy".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
