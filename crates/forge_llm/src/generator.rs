//! Code generator contract and the model-backed implementation.

use std::sync::Arc;

use async_trait::async_trait;
use forge_core::{GenerationRequest, ProgressEmitter};
use tracing::{info, warn};

use crate::error::GenerationResult;
use crate::extract::extract_code;
use crate::llm::CompletionClient;
use crate::prompts;
use crate::validate::StructuralValidator;

/// Produces and repairs contract source.
///
/// Every method returns the extracted code payload. Transport failures are
/// surfaced as-is and never retried here.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Get the generator name.
    fn name(&self) -> &str;

    /// Generate a contract for `request`, reporting progress on `progress`.
    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressEmitter,
    ) -> GenerationResult<String>;

    /// Patch `source` given the build `errors` of attempt `attempt`.
    async fn fix(
        &self,
        source: &str,
        errors: &str,
        attempt: u32,
        max_attempts: u32,
    ) -> GenerationResult<String>;

    /// Generate scenario tests for compiled `source`.
    async fn generate_tests(&self, source: &str) -> GenerationResult<String>;
}

/// Generator backed by a hosted model.
pub struct LlmCodeGenerator {
    client: Arc<dyn CompletionClient>,
    validator: StructuralValidator,
}

impl LlmCodeGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            validator: StructuralValidator::new(),
        }
    }

    pub fn with_validator(mut self, validator: StructuralValidator) -> Self {
        self.validator = validator;
        self
    }
}

#[async_trait]
impl CodeGenerator for LlmCodeGenerator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressEmitter,
    ) -> GenerationResult<String> {
        progress.status("Generating contract code with AI...", Some(10));
        progress.terminal("> Starting AI code generation...\n", false);

        let preview: String = request.description.chars().take(50).collect();
        info!(model = %self.client.model(), "Generating contract for: {}...", preview);

        let response = self
            .client
            .complete(&prompts::contract_prompt(&request.description, &request.category))
            .await?;
        let code = extract_code(&response);
        self.validator.check(&code)?;

        let report = self.validator.report(&code);
        if !report.valid {
            warn!("Generated code has advisory findings: {}", report.errors.join("; "));
        }

        info!("Code generated successfully ({} bytes)", code.len());
        progress.status("Code generated successfully", Some(30));
        Ok(code)
    }

    async fn fix(
        &self,
        source: &str,
        errors: &str,
        attempt: u32,
        max_attempts: u32,
    ) -> GenerationResult<String> {
        info!(attempt, max_attempts, "Requesting fix for compilation errors");
        let response = self
            .client
            .complete(&prompts::fix_prompt(source, errors, attempt, max_attempts))
            .await?;
        Ok(extract_code(&response))
    }

    async fn generate_tests(&self, source: &str) -> GenerationResult<String> {
        let response = self.client.complete(&prompts::tests_prompt(source)).await?;
        Ok(extract_code(&response))
    }
}
