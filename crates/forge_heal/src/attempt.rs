//! Attempt history and loop results.

use forge_runner::{ArtifactRefs, BuildOutcome};
use serde::Serialize;

/// Healing loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealState {
    Generating,
    Compiling,
    Fixing,
    Succeeded,
    Exhausted,
}

impl HealState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }
}

/// One compile cycle.
#[derive(Debug, Clone, Serialize)]
pub struct HealAttempt {
    /// 1-indexed attempt number
    pub number: u32,
    /// Source compiled in this attempt
    pub source: String,
    pub outcome: BuildOutcome,
    /// Patched source for the next attempt, only on a failed non-final attempt
    pub next_source: Option<String>,
    /// States entered during this attempt, in order
    pub transitions: Vec<HealState>,
}

/// Result of a healing run.
#[derive(Debug, Clone, Serialize)]
pub struct HealReport {
    pub success: bool,
    /// Last candidate source (the compiled one on success)
    pub final_source: String,
    pub artifacts: Option<ArtifactRefs>,
    /// Error text of the last failed compile
    pub last_errors: Option<String>,
    pub warnings: Option<String>,
    pub attempts_used: u32,
    pub attempts: Vec<HealAttempt>,
    /// `Succeeded` or `Exhausted`
    pub terminal: HealState,
    /// Set when the loop stopped because fix generation failed
    pub fix_error: Option<String>,
}

impl HealReport {
    pub fn is_exhausted(&self) -> bool {
        self.terminal == HealState::Exhausted
    }
}
