//! The bounded compile/fix loop.

use std::sync::Arc;

use forge_core::{GenerationRequest, ProgressEmitter};
use forge_llm::CodeGenerator;
use forge_runner::{BuildOutcome, BuildTool, LogHandler, LogLine};
use tracing::{info, warn};

use crate::attempt::{HealAttempt, HealReport, HealState};
use crate::config::HealConfig;
use crate::error::HealResult;

/// Path under which patched source is re-emitted.
pub const SOURCE_PATH: &str = "src/lib.rs";

/// Compiles a candidate, feeds failures back to the generator, and repeats
/// until the build passes or the attempt budget runs out.
///
/// Attempts are strictly sequential. Every transition is narrated on the
/// emitter, so the attempt history can be rebuilt from the event feed alone.
pub struct HealingLoop {
    builder: Arc<dyn BuildTool>,
    generator: Arc<dyn CodeGenerator>,
    config: HealConfig,
}

impl HealingLoop {
    pub fn new(
        builder: Arc<dyn BuildTool>,
        generator: Arc<dyn CodeGenerator>,
        config: HealConfig,
    ) -> Self {
        Self {
            builder,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &HealConfig {
        &self.config
    }

    pub fn generator(&self) -> &Arc<dyn CodeGenerator> {
        &self.generator
    }

    /// Run the initial generation, then heal the result.
    ///
    /// A generation failure is returned as-is; no compile is attempted.
    pub async fn generate_and_heal(
        &self,
        request: &GenerationRequest,
        progress: &ProgressEmitter,
    ) -> HealResult<HealReport> {
        let source = self.generator.generate(request, progress).await?;
        progress.file(SOURCE_PATH, source.clone());
        Ok(self.heal(&source, progress).await)
    }

    /// Compile `source`, fixing and recompiling on failure.
    ///
    /// Never fails: build errors, build tool errors, and fix failures all
    /// end as a report with `success == false`.
    pub async fn heal(&self, source: &str, progress: &ProgressEmitter) -> HealReport {
        let max = self.config.max_attempts.max(1);
        let mut current = source.to_string();
        let mut attempts: Vec<HealAttempt> = Vec::new();
        let mut last_errors: Option<String> = None;
        let mut last_warnings: Option<String> = None;
        let mut fix_error: Option<String> = None;

        for number in 1..=max {
            progress.compile_start();
            progress.terminal(
                format!("\n> Compiling (attempt {}/{})...\n", number, max),
                false,
            );

            let outcome = self.compile(&current, progress).await;
            let mut transitions = vec![HealState::Compiling];

            if outcome.success {
                progress.compile_result(true, None, outcome.warnings.clone());
                progress.terminal("✓ Compilation successful!\n", false);
                if let Some(warnings) = &outcome.warnings {
                    progress.terminal(format!("\nWarnings:\n{}\n", warnings), false);
                }
                info!(
                    session_id = %progress.session_id(),
                    attempt = number,
                    "Contract compiled"
                );

                transitions.push(HealState::Succeeded);
                let artifacts = outcome.artifacts.clone();
                let warnings = outcome.warnings.clone();
                attempts.push(HealAttempt {
                    number,
                    source: current.clone(),
                    outcome,
                    next_source: None,
                    transitions,
                });

                return HealReport {
                    success: true,
                    final_source: current,
                    artifacts,
                    last_errors: None,
                    warnings,
                    attempts_used: number,
                    attempts,
                    terminal: HealState::Succeeded,
                    fix_error: None,
                };
            }

            let errors = outcome.error_text().to_string();
            progress.compile_result(false, Some(errors.clone()), outcome.warnings.clone());
            progress.terminal(format!("✗ Compilation failed\n\n{}\n", errors), true);
            warn!(
                session_id = %progress.session_id(),
                attempt = number,
                max_attempts = max,
                timed_out = outcome.timed_out,
                "Compilation failed"
            );
            last_errors = Some(errors.clone());
            last_warnings = outcome.warnings.clone();

            if number == max {
                progress.terminal(
                    format!("\n✗ Max attempts ({}) reached. Unable to fix errors.\n", max),
                    true,
                );
                transitions.push(HealState::Exhausted);
                attempts.push(HealAttempt {
                    number,
                    source: current.clone(),
                    outcome,
                    next_source: None,
                    transitions,
                });
                break;
            }

            progress.fixing(number, max);
            progress.terminal("\n> AI analyzing errors and generating fix...\n", false);
            transitions.push(HealState::Fixing);

            match self.generator.fix(&current, &errors, number, max).await {
                Ok(patched) => {
                    progress.terminal(format!("✓ Generated fix for attempt {}\n", number + 1), false);
                    progress.file(SOURCE_PATH, patched.clone());
                    attempts.push(HealAttempt {
                        number,
                        source: std::mem::replace(&mut current, patched.clone()),
                        outcome,
                        next_source: Some(patched),
                        transitions,
                    });
                }
                Err(e) => {
                    progress.terminal(format!("✗ Error generating fix: {}\n", e), true);
                    warn!(
                        session_id = %progress.session_id(),
                        attempt = number,
                        "Fix generation failed: {}", e
                    );
                    transitions.push(HealState::Exhausted);
                    attempts.push(HealAttempt {
                        number,
                        source: current.clone(),
                        outcome,
                        next_source: None,
                        transitions,
                    });
                    fix_error = Some(e.to_string());
                    break;
                }
            }
        }

        HealReport {
            success: false,
            final_source: current,
            artifacts: None,
            last_errors,
            warnings: last_warnings,
            attempts_used: attempts.len() as u32,
            attempts,
            terminal: HealState::Exhausted,
            fix_error,
        }
    }

    /// One build call. Tool errors and the hard ceiling become failed
    /// outcomes.
    async fn compile(&self, source: &str, progress: &ProgressEmitter) -> BuildOutcome {
        let on_line: Option<LogHandler> = if self.config.stream_build_output {
            let emitter = progress.clone();
            Some(Arc::new(move |line: LogLine| {
                emitter.terminal(format!("{}\n", line.message), line.stream.is_error());
            }))
        } else {
            None
        };

        let call = self
            .builder
            .compile_with_logs(source, &self.config.project_label, on_line);

        let result = match self.config.compile_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    let mut outcome = BuildOutcome::failed_with(format!(
                        "Build timed out after {} seconds",
                        limit.as_secs()
                    ));
                    outcome.timed_out = true;
                    return outcome;
                }
            },
            None => call.await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(tool = %self.builder.name(), "Build tool error: {}", e);
                BuildOutcome::failed_with(format!("Build tool error: {}", e))
            }
        }
    }
}
