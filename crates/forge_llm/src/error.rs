//! Error types for code generation.

use thiserror::Error;

/// Result type alias for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Code generation failures.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Network, quota, or auth failure talking to the model
    #[error("LLM request failed: {0}")]
    Transport(String),

    #[error("LLM not configured. Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY")]
    NotConfigured,

    /// The model answered but the code is structurally unusable
    #[error("Generated code failed validation: {}", .problems.join("; "))]
    Validation { problems: Vec<String> },

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

impl GenerationError {
    /// Whether this is a structural validation failure rather than a
    /// transport problem.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_problems() {
        let err = GenerationError::Validation {
            problems: vec!["Missing #![no_std] declaration".into(), "Missing contract attribute".into()],
        };
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Generated code failed validation: Missing #![no_std] declaration; Missing contract attribute"
        );
        assert!(!GenerationError::Transport("quota".into()).is_validation());
    }
}
