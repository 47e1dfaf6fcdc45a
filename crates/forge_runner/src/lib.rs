//! # forge_runner
//!
//! Build tool adapter for Contract Forge.
//!
//! Every compile call materializes a throwaway contract project, runs the
//! toolchain in it, and reports a [`BuildOutcome`] with the raw interleaved
//! output plus best-effort extracted error and warning text.
//!
//! # Features
//!
//! - **Command Build Tool**: runs `mxpy contract build` (or any configured
//!   program) with an optional deadline
//! - **Artifact-based success**: a build passed when its `.wasm` exists
//! - **Pluggable Extraction**: line-scraping or cargo JSON diagnostics
//! - **Mock Build Tool**: scripted outcomes for tests and demos
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_runner::{BuildConfig, BuildTool, CommandBuildTool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tool = CommandBuildTool::new(BuildConfig::default().timeout_seconds(120));
//!     let outcome = tool.compile("#![no_std]\n...", "contract").await?;
//!     if !outcome.success {
//!         println!("{}", outcome.error_text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod mock;
pub mod outcome;
pub mod project;
pub mod tool;

pub use command::CommandBuildTool;
pub use config::{ArtifactConvention, BuildConfig, DiagnosticFormat, JSON_MESSAGE_FLAG};
pub use error::{RunnerError, RunnerResult};
pub use extract::{
    parse_compiler_errors, CargoJsonExtractor, CompilerDiagnostic, DiagnosticExtractor,
    LineScrapeExtractor,
};
pub use mock::{CapturedBuild, MockBuild, MockBuildTool};
pub use outcome::{ArtifactRefs, BuildOutcome, UNKNOWN_BUILD_ERROR};
pub use project::{crate_name, project_files, ContractProject, ProjectFile};
pub use tool::{BuildTool, LogHandler, LogLine, LogStream};
