//! Service configuration.
//!
//! Resolved once at startup. Later sources win: built-in defaults, the TOML
//! file, environment variables, then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use forge_heal::{CompileMode, HealConfig, PipelineConfig};
use forge_llm::{LlmConfig, LlmProvider};
use forge_runner::{ArtifactConvention, BuildConfig, DiagnosticFormat};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Which code generator serves sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// First provider with an API key in the environment
    Auto,
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    Mock,
}

impl GeneratorKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "mock" => Some(Self::Mock),
            other => LlmProvider::parse(other).map(|provider| match provider {
                LlmProvider::Gemini => Self::Gemini,
                LlmProvider::OpenAI => Self::OpenAI,
                LlmProvider::Anthropic => Self::Anthropic,
            }),
        }
    }

    /// The hosted provider this kind pins, if any.
    pub fn provider(&self) -> Option<LlmProvider> {
        match self {
            Self::Gemini => Some(LlmProvider::Gemini),
            Self::OpenAI => Some(LlmProvider::OpenAI),
            Self::Anthropic => Some(LlmProvider::Anthropic),
            Self::Auto | Self::Mock => None,
        }
    }
}

/// Where accepted contracts are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Pinata when both keys are present, otherwise the local directory
    Auto,
    Pinata,
    Local,
    Memory,
}

impl StoreKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "pinata" | "ipfs" => Some(Self::Pinata),
            "local" => Some(Self::Local),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Pinata credentials and endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinataSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub api_base: Option<String>,
    pub gateway: Option<String>,
}

impl PinataSettings {
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.api_key) && present(&self.secret_key)
    }
}

/// Build toolchain overrides; unset fields keep [`BuildConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub work_dir: Option<PathBuf>,
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub keep_workspace: bool,
    pub convention: Option<ArtifactConvention>,
    /// Where artifacts of successful builds are kept
    pub artifact_dir: Option<PathBuf>,
    /// `text` or `json`; `json` passes `--message-format=json` to the toolchain
    pub diagnostics: DiagnosticFormat,
}

/// Settings applied from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub generator: Option<GeneratorKind>,
    pub store: Option<StoreKind>,
    pub max_attempts: Option<u32>,
    pub skip_compile: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub generator: GeneratorKind,
    pub llm: LlmConfig,
    pub store: StoreKind,
    pub store_dir: PathBuf,
    pub pinata: PinataSettings,
    pub build: BuildSettings,
    pub max_attempts: u32,
    /// Per compile call, 0 disables the deadline
    pub compile_timeout_secs: u64,
    pub skip_compile: bool,
    pub generate_tests: bool,
    pub sdk_version: String,
    /// Multiplier on the mock generator's pauses
    pub mock_delay_scale: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            generator: GeneratorKind::Auto,
            llm: LlmConfig::default(),
            store: StoreKind::Auto,
            store_dir: PathBuf::from("artifacts"),
            pinata: PinataSettings::default(),
            build: BuildSettings::default(),
            max_attempts: forge_heal::config::DEFAULT_MAX_ATTEMPTS,
            compile_timeout_secs: 300,
            skip_compile: false,
            generate_tests: true,
            sdk_version: "0.64.0".to_string(),
            mock_delay_scale: 1.0,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> ServerResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ServerError::Config(format!("{} must be a number, got '{}'", var, value)))
}

impl ServerConfig {
    /// Read a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ServerResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply environment variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.port = parse_number("PORT", &port)?;
        }
        if get("MOCK_MODE").is_some_and(|v| parse_bool(&v)) {
            self.generator = GeneratorKind::Mock;
            self.skip_compile = true;
        }
        if let Some(name) = get("FORGE_GENERATOR") {
            self.generator = GeneratorKind::parse(&name)
                .ok_or_else(|| ServerError::Config(format!("Unknown generator '{}'", name)))?;
        }
        if let Some(model) = get("FORGE_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(key) = get("PINATA_API_KEY") {
            self.pinata.api_key = Some(key);
        }
        if let Some(secret) = get("PINATA_SECRET_KEY") {
            self.pinata.secret_key = Some(secret);
        }
        if let Some(name) = get("FORGE_STORE") {
            self.store = StoreKind::parse(&name)
                .ok_or_else(|| ServerError::Config(format!("Unknown store '{}'", name)))?;
        }
        if let Some(dir) = get("FORGE_STORE_DIR") {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("FORGE_WORK_DIR") {
            self.build.work_dir = Some(PathBuf::from(dir));
        }
        if let Some(program) = get("FORGE_BUILD_PROGRAM") {
            self.build.program = Some(program);
        }
        if let Some(dir) = get("FORGE_ARTIFACT_DIR") {
            self.build.artifact_dir = Some(PathBuf::from(dir));
        }
        if let Some(format) = get("FORGE_BUILD_DIAGNOSTICS") {
            self.build.diagnostics = DiagnosticFormat::parse(&format).ok_or_else(|| {
                ServerError::Config(format!("Unknown diagnostics format '{}'", format))
            })?;
        }
        if let Some(attempts) = get("FORGE_MAX_ATTEMPTS") {
            self.max_attempts = parse_number("FORGE_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(secs) = get("FORGE_COMPILE_TIMEOUT_SECS") {
            self.compile_timeout_secs = parse_number("FORGE_COMPILE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(skip) = get("FORGE_SKIP_COMPILE") {
            self.skip_compile = parse_bool(&skip);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(generator) = overrides.generator {
            self.generator = generator;
        }
        if let Some(store) = overrides.store {
            self.store = store;
        }
        if let Some(attempts) = overrides.max_attempts {
            self.max_attempts = attempts;
        }
        if overrides.skip_compile {
            self.skip_compile = true;
        }
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_attempts == 0 {
            return Err(ServerError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.store == StoreKind::Pinata && !self.pinata.has_credentials() {
            return Err(ServerError::Config(
                "Pinata store needs PINATA_API_KEY and PINATA_SECRET_KEY".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.mock_delay_scale) {
            return Err(ServerError::Config("mock_delay_scale must be within 0..=100".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Store kind after resolving `Auto`.
    pub fn effective_store(&self) -> StoreKind {
        match self.store {
            StoreKind::Auto if self.pinata.has_credentials() => StoreKind::Pinata,
            StoreKind::Auto => StoreKind::Local,
            other => other,
        }
    }

    pub fn compile_timeout(&self) -> Option<Duration> {
        (self.compile_timeout_secs > 0).then(|| Duration::from_secs(self.compile_timeout_secs))
    }

    pub fn build_config(&self) -> BuildConfig {
        let mut config = BuildConfig::new()
            .timeout_seconds(self.compile_timeout_secs)
            .keep_workspace(self.build.keep_workspace)
            .diagnostics(self.build.diagnostics)
            .sdk_version(self.sdk_version.clone());
        if let Some(dir) = &self.build.work_dir {
            config = config.work_root(dir.clone());
        }
        if let Some(program) = &self.build.program {
            config = config.program(program.clone());
        }
        if let Some(dir) = &self.build.artifact_dir {
            config = config.artifact_dir(dir.clone());
        }
        if let Some(args) = &self.build.args {
            config = config.args(args.clone());
        }
        if let Some(convention) = self.build.convention {
            config = config.artifact_convention(convention);
        }
        config
    }

    /// The build tool enforces the deadline itself; the loop ceiling sits a
    /// little above it so a wedged tool still ends the attempt.
    pub fn heal_config(&self) -> HealConfig {
        HealConfig::new()
            .max_attempts(self.max_attempts)
            .compile_timeout(self.compile_timeout().map(|t| t + Duration::from_secs(30)))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .compile_mode(if self.skip_compile {
                CompileMode::Skip
            } else {
                CompileMode::Full
            })
            .generate_tests(self.generate_tests)
            .sdk_version(self.sdk_version.clone())
    }

    pub fn llm_config(&self) -> LlmConfig {
        let mut llm = self.llm.clone();
        if let Some(provider) = self.generator.provider() {
            llm.provider = Some(provider);
        }
        llm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.effective_store(), StoreKind::Local);
        assert_eq!(config.pipeline_config().compile_mode, CompileMode::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_keeps_unset_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            port = 8080
            generator = "openai"

            [build]
            program = "sc-meta"
            args = ["all", "build"]
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.generator, GeneratorKind::OpenAI);
        assert_eq!(config.compile_timeout_secs, 300);
        let build = config.build_config();
        assert_eq!(build.program, "sc-meta");
        assert_eq!(build.args, vec!["all", "build"]);
    }

    #[test]
    fn test_json_diagnostics_from_file_and_env() {
        let config = ServerConfig::from_toml(
            r#"
            [build]
            program = "cargo"
            args = ["build", "--release"]
            diagnostics = "json"
            artifact_dir = "/var/forge/wasm"
            "#,
        )
        .unwrap();
        let build = config.build_config();
        assert_eq!(build.diagnostics, DiagnosticFormat::Json);
        assert_eq!(build.effective_args(), vec!["build", "--release", "--message-format=json"]);
        assert_eq!(build.artifact_dir, PathBuf::from("/var/forge/wasm"));

        let mut config = ServerConfig::default();
        assert_eq!(config.build_config().diagnostics, DiagnosticFormat::Text);
        config.apply_env(env(&[("FORGE_BUILD_DIAGNOSTICS", "json")])).unwrap();
        assert_eq!(config.build_config().diagnostics, DiagnosticFormat::Json);
        assert!(config.apply_env(env(&[("FORGE_BUILD_DIAGNOSTICS", "xml")])).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ServerConfig::from_toml("port = 8080\nmax_attempts = 5\n").unwrap();
        config
            .apply_env(env(&[("PORT", "9000"), ("FORGE_COMPILE_TIMEOUT_SECS", "0")]))
            .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.max_attempts, 5);
        assert!(config.compile_timeout().is_none());
        assert!(config.heal_config().compile_timeout.is_none());
    }

    #[test]
    fn test_mock_mode_alias() {
        let mut config = ServerConfig::default();
        config.apply_env(env(&[("MOCK_MODE", "true")])).unwrap();
        assert_eq!(config.generator, GeneratorKind::Mock);
        assert_eq!(config.pipeline_config().compile_mode, CompileMode::Skip);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = ServerConfig::default();
        config.apply_env(env(&[("FORGE_GENERATOR", "gemini"), ("PORT", "4000")])).unwrap();
        config.apply_overrides(&Overrides {
            port: Some(5000),
            generator: Some(GeneratorKind::Mock),
            ..Default::default()
        });
        assert_eq!(config.port, 5000);
        assert_eq!(config.generator, GeneratorKind::Mock);
    }

    #[test]
    fn test_bad_env_values_rejected() {
        let mut config = ServerConfig::default();
        assert!(config.apply_env(env(&[("PORT", "eighty")])).is_err());
        assert!(config.apply_env(env(&[("FORGE_STORE", "s3")])).is_err());
    }

    #[test]
    fn test_pinata_selected_with_credentials() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[("PINATA_API_KEY", "k"), ("PINATA_SECRET_KEY", "s")]))
            .unwrap();
        assert_eq!(config.effective_store(), StoreKind::Pinata);

        let explicit = ServerConfig {
            store: StoreKind::Pinata,
            ..Default::default()
        };
        assert!(explicit.validate().is_err());
    }

    #[test]
    fn test_pinned_provider_flows_into_llm_config() {
        let config = ServerConfig {
            generator: GeneratorKind::Anthropic,
            ..Default::default()
        };
        assert_eq!(config.llm_config().provider, Some(LlmProvider::Anthropic));
    }
}
