//! Mock build tool for testing.
//!
//! Returns scripted outcomes without touching the filesystem or running a
//! toolchain, and records every compile call for verification.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::extract::{DiagnosticExtractor, LineScrapeExtractor};
use crate::outcome::{ArtifactRefs, BuildOutcome};
use crate::tool::{BuildTool, LogHandler, LogLine, LogStream};

/// Predefined outcome for a compile call.
#[derive(Debug, Clone)]
pub struct MockBuild {
    pub success: bool,
    /// Raw output; diagnostics are extracted from it
    pub output: String,
    pub delay_ms: u64,
}

impl MockBuild {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            delay_ms: 0,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }
}

/// Captured compile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedBuild {
    pub source: String,
    pub label: String,
}

/// Mock build tool.
///
/// Responses are returned in order and cycle once exhausted. With no
/// responses configured every build succeeds.
#[derive(Clone)]
pub struct MockBuildTool {
    responses: Arc<RwLock<Vec<MockBuild>>>,
    response_index: Arc<AtomicUsize>,
    captured_calls: Arc<RwLock<Vec<CapturedBuild>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
    extractor: Arc<dyn DiagnosticExtractor>,
}

impl Default for MockBuildTool {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBuildTool {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
            extractor: Arc::new(LineScrapeExtractor::new()),
        }
    }

    /// Add a response for the next compile call.
    pub fn add_response(self, response: MockBuild) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple responses.
    pub fn with_responses(self, responses: Vec<MockBuild>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Make every compile call return `Err`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DiagnosticExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Get all captured calls.
    pub fn calls(&self) -> Vec<CapturedBuild> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    fn next_response(&self) -> MockBuild {
        let responses = self.responses.read();
        if responses.is_empty() {
            return MockBuild::success("Finished release target(s)");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockBuild::success(""))
    }
}

#[async_trait]
impl BuildTool for MockBuildTool {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compile_with_logs(
        &self,
        source: &str,
        label: &str,
        on_line: Option<LogHandler>,
    ) -> RunnerResult<BuildOutcome> {
        self.captured_calls.write().push(CapturedBuild {
            source: source.to_string(),
            label: label.to_string(),
        });

        let failure = self.simulate_failure.read().clone();
        if let Some(msg) = failure {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        let response = self.next_response();
        if response.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
        }

        if let Some(handler) = &on_line {
            for line in response.output.lines() {
                handler(LogLine::new(LogStream::Stdout, line));
            }
        }

        let outcome = BuildOutcome::from_output(
            response.success,
            response.output,
            self.extractor.as_ref(),
        )
        .with_exit_code(Some(if response.success { 0 } else { 1 }))
        .with_duration_ms(response.delay_ms);

        if !outcome.success {
            return Ok(outcome);
        }
        let output = PathBuf::from("/mock/output");
        Ok(outcome.with_artifacts(ArtifactRefs {
            wasm_path: output.join(format!("{}.wasm", label)),
            abi_path: Some(output.join(format!("{}.abi.json", label))),
        }))
    }
}
