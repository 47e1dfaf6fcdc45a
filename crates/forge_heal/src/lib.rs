//! # forge_heal
//!
//! The generate → compile → diagnose → patch loop.
//!
//! # Architecture
//!
//! - **HealingLoop**: bounded compile/fix cycle over a [`BuildTool`] and a
//!   [`CodeGenerator`], narrating every step on a [`ProgressEmitter`]
//! - **GenerationPipeline**: one whole session: generate, emit project
//!   files, heal, generate tests, store, and finish with exactly one
//!   terminal event
//! - **SessionLauncher**: reserves the session id and runs the pipeline as a
//!   background task with a result channel
//!
//! [`BuildTool`]: forge_runner::BuildTool
//! [`CodeGenerator`]: forge_llm::CodeGenerator
//! [`ProgressEmitter`]: forge_core::ProgressEmitter

pub mod attempt;
pub mod config;
pub mod error;
pub mod healing;
pub mod launcher;
pub mod pipeline;

pub use attempt::{HealAttempt, HealReport, HealState};
pub use config::{CompileMode, HealConfig, PipelineConfig};
pub use error::{HealError, HealResult};
pub use healing::HealingLoop;
pub use launcher::{SessionHandle, SessionLauncher};
pub use pipeline::{CompletePayload, GenerationPipeline, SessionResult};
