//! One generation session from prompt to stored artifact.

use std::sync::Arc;

use forge_core::{ArtifactMetadata, GenerationRequest, ProgressEmitter};
use forge_llm::CodeGenerator;
use forge_runner::project_files;
use forge_store::ArtifactStore;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::attempt::HealReport;
use crate::config::{CompileMode, PipelineConfig};
use crate::error::HealResult;
use crate::healing::{HealingLoop, SOURCE_PATH};

/// Path the optional generated tests are emitted under.
pub const TESTS_PATH: &str = "tests/integration_test.rs";

/// Body of the `complete` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

/// Final result of one session, also delivered over the launcher's channel.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub session_id: String,
    /// True only when the contract compiled (or compile was skipped) and the
    /// artifact was stored
    pub success: bool,
    /// Present when the session ended with a `complete` event
    pub payload: Option<CompletePayload>,
    /// Present when the session ended with an `error` event
    pub error: Option<String>,
    pub report: Option<HealReport>,
}

impl SessionResult {
    fn completed(session_id: &str, payload: CompletePayload, report: Option<HealReport>) -> Self {
        Self {
            session_id: session_id.to_string(),
            success: payload.success,
            payload: Some(payload),
            error: None,
            report,
        }
    }

    pub(crate) fn failed(session_id: &str, error: impl Into<String>) -> Self {
        Self {
            session_id: session_id.to_string(),
            success: false,
            payload: None,
            error: Some(error.into()),
            report: None,
        }
    }

    /// Stored artifact id, when the session got that far.
    pub fn cid(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.ipfs_hash.as_deref())
    }
}

fn compile_failure_message(attempts: u32) -> String {
    let noun = if attempts == 1 { "attempt" } else { "attempts" };
    format!("Failed to compile after {} {}", attempts, noun)
}

/// Runs a whole session: generate, scaffold, heal, test, store.
///
/// Every run ends with exactly one terminal event on the emitter.
pub struct GenerationPipeline {
    healer: HealingLoop,
    store: Arc<dyn ArtifactStore>,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(healer: HealingLoop, store: Arc<dyn ArtifactStore>, config: PipelineConfig) -> Self {
        Self {
            healer,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub async fn run(&self, request: &GenerationRequest, progress: &ProgressEmitter) -> SessionResult {
        let session_id = request.session_id.as_str();
        info!(
            session_id = %session_id,
            category = %request.category,
            generator = %self.healer.generator().name(),
            "Starting generation"
        );

        match self.execute(request, progress).await {
            Ok((payload, report)) => {
                match serde_json::to_value(&payload) {
                    Ok(data) => progress.complete(data),
                    Err(e) => {
                        error!(session_id = %session_id, "Failed to encode payload: {}", e);
                        progress.error(format!("Internal error: {}", e));
                        return SessionResult::failed(session_id, e.to_string());
                    }
                }
                info!(
                    session_id = %session_id,
                    success = payload.success,
                    "Generation finished"
                );
                SessionResult::completed(session_id, payload, report)
            }
            Err(e) => {
                error!(session_id = %session_id, "Generation failed: {}", e);
                progress.error(e.to_string());
                SessionResult::failed(session_id, e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        progress: &ProgressEmitter,
    ) -> HealResult<(CompletePayload, Option<HealReport>)> {
        let generator = self.healer.generator();

        let generated = generator.generate(request, progress).await?;
        progress.file(SOURCE_PATH, generated.clone());
        progress.terminal(
            format!("Generated {} lines of code\n", generated.lines().count()),
            false,
        );

        progress.status("Creating project structure...", Some(40));
        progress.terminal("\n> Creating project files...\n", false);
        let files = project_files(&generated, &self.config.project_label, &self.config.sdk_version)?;
        for file in files {
            let path = file.path.to_string_lossy().replace('\\', "/");
            if path != SOURCE_PATH {
                progress.file(path.clone(), file.content);
            }
            progress.terminal(format!("  Created {}\n", path), false);
        }

        let (source, report) = match self.config.compile_mode {
            CompileMode::Skip => {
                progress.status("Code generated (skipping compilation)", Some(80));
                (generated, None)
            }
            CompileMode::Full => {
                progress.status("Compiling contract...", Some(50));
                let report = self.healer.heal(&generated, progress).await;
                if !report.success {
                    progress.status("Compilation failed", Some(100));
                    let payload = CompletePayload {
                        success: false,
                        attempts: Some(report.attempts_used),
                        error: Some(compile_failure_message(report.attempts_used)),
                        errors: report.last_errors.clone(),
                        ..Default::default()
                    };
                    return Ok((payload, Some(report)));
                }
                (report.final_source.clone(), Some(report))
            }
        };

        if self.config.generate_tests && report.is_some() {
            progress.status("Generating tests...", Some(70));
            match generator.generate_tests(&source).await {
                Ok(tests) => progress.file(TESTS_PATH, tests),
                Err(e) => {
                    warn!(session_id = %request.session_id, "Test generation failed: {}", e);
                    progress.terminal("⚠ Test generation failed (optional)\n", false);
                }
            }
        }

        progress.status("Uploading to IPFS...", Some(85));
        let metadata = ArtifactMetadata::for_request(request);
        let cid = self.store.put(&source, &metadata).await?;
        info!(session_id = %request.session_id, cid = %cid, store = self.store.name(), "Artifact stored");
        progress.terminal(format!("✓ Stored as {}\n", cid), false);

        progress.status("Ready to deploy!", Some(100));
        progress.terminal("\n✓ Contract ready for deployment!\n", false);

        let artifacts = report.as_ref().and_then(|r| r.artifacts.clone());
        let payload = CompletePayload {
            success: true,
            code: Some(source),
            wasm_path: artifacts
                .as_ref()
                .map(|a| a.wasm_path.to_string_lossy().into_owned()),
            abi_path: artifacts
                .as_ref()
                .and_then(|a| a.abi_path.as_ref())
                .map(|p| p.to_string_lossy().into_owned()),
            ipfs_hash: Some(cid),
            attempts: Some(report.as_ref().map(|r| r.attempts_used).unwrap_or(0)),
            ..Default::default()
        };
        Ok((payload, report))
    }
}
