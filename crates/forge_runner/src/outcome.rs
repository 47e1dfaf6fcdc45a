//! Build outcome reporting.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::extract::DiagnosticExtractor;

/// Error text reported when a failed build yields nothing extractable.
pub const UNKNOWN_BUILD_ERROR: &str = "Unknown compilation error";

/// Paths of the artifacts a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRefs {
    pub wasm_path: PathBuf,
    pub abi_path: Option<PathBuf>,
}

/// Result of one compile call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutcome {
    /// Whether the build produced its artifact
    pub success: bool,
    /// Interleaved stdout and stderr
    pub raw_output: String,
    /// Extracted error text, only present on failure
    pub errors: Option<String>,
    /// Extracted warning text
    pub warnings: Option<String>,
    /// Artifact locations, only present on success
    pub artifacts: Option<ArtifactRefs>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

fn non_empty(text: String) -> Option<String> {
    (!text.trim().is_empty()).then_some(text)
}

impl BuildOutcome {
    /// Build an outcome from raw output, extracting diagnostics.
    pub fn from_output(
        success: bool,
        raw_output: impl Into<String>,
        extractor: &dyn DiagnosticExtractor,
    ) -> Self {
        let raw_output = raw_output.into();
        let errors = if success {
            None
        } else {
            non_empty(extractor.errors(&raw_output))
        };
        let warnings = non_empty(extractor.warnings(&raw_output));

        Self {
            success,
            raw_output,
            errors,
            warnings,
            artifacts: None,
            exit_code: None,
            timed_out: false,
            duration_ms: 0,
        }
    }

    /// A build that was stopped at its deadline.
    pub fn timed_out(
        timeout_seconds: u64,
        raw_output: impl Into<String>,
        extractor: &dyn DiagnosticExtractor,
    ) -> Self {
        let mut outcome = Self::from_output(false, raw_output, extractor);
        let notice = format!("Build timed out after {} seconds", timeout_seconds);
        outcome.errors = Some(match outcome.errors.take() {
            Some(errors) => format!("{}\n\n{}", notice, errors),
            None => notice,
        });
        outcome.timed_out = true;
        outcome
    }

    /// A failure with a fixed error message and no tool output.
    pub fn failed_with(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            raw_output: message.clone(),
            errors: non_empty(message),
            warnings: None,
            artifacts: None,
            exit_code: None,
            timed_out: false,
            duration_ms: 0,
        }
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactRefs) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Error text to feed back to a fixer.
    ///
    /// Falls back to [`UNKNOWN_BUILD_ERROR`] when nothing was extracted.
    pub fn error_text(&self) -> &str {
        self.errors.as_deref().unwrap_or(UNKNOWN_BUILD_ERROR)
    }
}
