//! # forge_llm
//!
//! Code generation clients for Contract Forge.
//!
//! A [`CodeGenerator`] turns a [`GenerationRequest`](forge_core::GenerationRequest)
//! into contract source and patches that source when the build fails. Two
//! implementations share the contract:
//!
//! - [`LlmCodeGenerator`] drives a hosted model through [`LlmAdapter`]
//!   (Gemini, OpenAI, or Anthropic)
//! - [`MockCodeGenerator`] returns a deterministic contract on a fixed delay
//!   schedule, with no network access
//!
//! Both return the extracted code payload, never the raw model response.

pub mod error;
pub mod extract;
pub mod generator;
pub mod llm;
pub mod mock;
pub mod prompts;
pub mod validate;

pub use error::{GenerationError, GenerationResult};
pub use extract::extract_code;
pub use generator::{CodeGenerator, LlmCodeGenerator};
pub use llm::{CompletionClient, LlmAdapter, LlmConfig, LlmProvider};
pub use mock::{CapturedFix, MockCodeGenerator, MockDelays};
pub use validate::{StructuralValidator, ValidationReport};
