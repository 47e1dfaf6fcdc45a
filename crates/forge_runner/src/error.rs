//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that prevent a build from producing an outcome at all.
///
/// A build that runs and fails is not an error; it is a failed
/// [`BuildOutcome`](crate::BuildOutcome).
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid project label: {0}")]
    InvalidLabel(String),

    #[error("Manifest generation failed: {0}")]
    Manifest(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
