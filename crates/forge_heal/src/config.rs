//! Healing and pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of compile attempts per session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for [`HealingLoop`](crate::HealingLoop).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealConfig {
    /// Compile attempts including the first (at least 1)
    pub max_attempts: u32,
    /// Hard ceiling on one compile call, on top of the build tool's own
    /// deadline
    pub compile_timeout: Option<Duration>,
    /// Contract label passed to the build tool
    pub project_label: String,
    /// Forward build output lines as terminal events
    pub stream_build_output: bool,
}

impl Default for HealConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            compile_timeout: None,
            project_label: "contract".to_string(),
            stream_build_output: true,
        }
    }
}

impl HealConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn compile_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn project_label(mut self, label: impl Into<String>) -> Self {
        self.project_label = label.into();
        self
    }

    pub fn stream_build_output(mut self, enabled: bool) -> Self {
        self.stream_build_output = enabled;
        self
    }
}

/// Whether a session compiles what it generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    Full,
    /// Generate and store without building
    Skip,
}

/// Configuration for [`GenerationPipeline`](crate::GenerationPipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub compile_mode: CompileMode,
    /// Ask the generator for scenario tests after a good build
    pub generate_tests: bool,
    /// multiversx-sc version in the emitted project files
    pub sdk_version: String,
    pub project_label: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            compile_mode: CompileMode::Full,
            generate_tests: true,
            sdk_version: "0.64.0".to_string(),
            project_label: "contract".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile_mode(mut self, mode: CompileMode) -> Self {
        self.compile_mode = mode;
        self
    }

    pub fn generate_tests(mut self, enabled: bool) -> Self {
        self.generate_tests = enabled;
        self
    }

    pub fn sdk_version(mut self, version: impl Into<String>) -> Self {
        self.sdk_version = version.into();
        self
    }

    pub fn project_label(mut self, label: impl Into<String>) -> Self {
        self.project_label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_attempts_floor() {
        assert_eq!(HealConfig::new().max_attempts(0).max_attempts, 1);
        assert_eq!(HealConfig::default().max_attempts, 3);
    }
}
