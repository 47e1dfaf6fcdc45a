//! Error types for healing and session runs.

use thiserror::Error;

/// Result type alias for heal operations.
pub type HealResult<T> = Result<T, HealError>;

/// Failures that end a session without a compile verdict.
///
/// Build failures and fix failures are not errors here; they end the loop
/// with a failed [`HealReport`](crate::HealReport).
#[derive(Error, Debug)]
pub enum HealError {
    #[error("Code generation failed: {0}")]
    Generation(#[from] forge_llm::GenerationError),

    #[error("Artifact storage failed: {0}")]
    Storage(#[from] forge_store::StoreError),

    #[error("Project setup failed: {0}")]
    Project(#[from] forge_runner::RunnerError),

    #[error(transparent)]
    Session(#[from] forge_core::CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
