//! Build tool trait and streaming log types.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::RunnerResult;
use crate::outcome::BuildOutcome;

/// A line of build output.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: chrono::DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

impl LogLine {
    pub fn new(stream: LogStream, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream,
            message: message.into(),
        }
    }
}

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Stderr)
    }
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Log handler callback type.
pub type LogHandler = Arc<dyn Fn(LogLine) + Send + Sync>;

/// Compiles contract source into a [`BuildOutcome`].
///
/// A build that runs and fails returns `Ok` with `success == false`. `Err`
/// is reserved for failures to run the build at all.
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Compile `source` as contract `label`, streaming output lines to
    /// `on_line` as they arrive.
    async fn compile_with_logs(
        &self,
        source: &str,
        label: &str,
        on_line: Option<LogHandler>,
    ) -> RunnerResult<BuildOutcome>;

    /// Compile `source` as contract `label`.
    async fn compile(&self, source: &str, label: &str) -> RunnerResult<BuildOutcome> {
        self.compile_with_logs(source, label, None).await
    }
}
