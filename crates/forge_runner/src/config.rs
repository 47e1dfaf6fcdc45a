//! Build tool configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::extract::{CargoJsonExtractor, DiagnosticExtractor, LineScrapeExtractor};

/// Flag appended to the toolchain arguments for JSON diagnostics.
pub const JSON_MESSAGE_FLAG: &str = "--message-format=json";

/// How a finished build decides whether it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactConvention {
    /// Success means `<output_dir>/<label>.wasm` exists
    WasmOutput,
    /// Success means the process exited with code zero
    ExitCode,
}

/// Shape of the diagnostics the toolchain prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticFormat {
    /// Human-readable rustc output, scraped line by line
    #[default]
    Text,
    /// Cargo `compiler-message` records
    Json,
}

impl DiagnosticFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration for [`CommandBuildTool`](crate::CommandBuildTool).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory under which throwaway projects are created
    pub work_root: PathBuf,
    /// Toolchain executable
    pub program: String,
    /// Arguments passed to the toolchain
    pub args: Vec<String>,
    /// Extra environment for the toolchain
    pub env: HashMap<String, String>,
    /// Deadline per compile call in seconds (0 = no deadline)
    pub timeout_seconds: u64,
    /// Keep project directories after the build instead of deleting them
    pub keep_workspace: bool,
    /// Where artifacts of successful builds are copied before the project
    /// directory is removed
    pub artifact_dir: PathBuf,
    pub diagnostics: DiagnosticFormat,
    /// Success signal
    pub artifact_convention: ArtifactConvention,
    /// Build output directory, relative to the project
    pub output_dir: String,
    /// multiversx-sc version written into generated manifests
    pub sdk_version: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let mut env = HashMap::new();
        env.insert("RUSTFLAGS".to_string(), "-C link-arg=-s".to_string());

        Self {
            work_root: std::env::temp_dir().join("forge-builds"),
            program: "mxpy".to_string(),
            args: vec!["contract".to_string(), "build".to_string()],
            env,
            timeout_seconds: 300,
            keep_workspace: false,
            artifact_dir: std::env::temp_dir().join("forge-artifacts"),
            diagnostics: DiagnosticFormat::Text,
            artifact_convention: ArtifactConvention::WasmOutput,
            output_dir: "output".to_string(),
            sdk_version: "0.64.0".to_string(),
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn diagnostics(mut self, format: DiagnosticFormat) -> Self {
        self.diagnostics = format;
        self
    }

    /// Toolchain arguments, with the JSON message flag added when JSON
    /// diagnostics are selected and the flag is not already present.
    pub fn effective_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        let has_flag = args.iter().any(|a| a.starts_with("--message-format"));
        if self.diagnostics == DiagnosticFormat::Json && !has_flag {
            args.push(JSON_MESSAGE_FLAG.to_string());
        }
        args
    }

    /// Extractor matching the selected diagnostics format.
    pub fn extractor(&self) -> Arc<dyn DiagnosticExtractor> {
        match self.diagnostics {
            DiagnosticFormat::Text => Arc::new(LineScrapeExtractor::new()),
            DiagnosticFormat::Json => Arc::new(CargoJsonExtractor::new()),
        }
    }

    pub fn artifact_convention(mut self, convention: ArtifactConvention) -> Self {
        self.artifact_convention = convention;
        self
    }

    pub fn sdk_version(mut self, version: impl Into<String>) -> Self {
        self.sdk_version = version.into();
        self
    }

    /// Deadline as a duration, `None` when disabled.
    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.timeout_seconds > 0).then(|| std::time::Duration::from_secs(self.timeout_seconds))
    }
}
