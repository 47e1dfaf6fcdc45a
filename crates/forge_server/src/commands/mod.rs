//! CLI command definitions.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use forge_server::{GeneratorKind, Overrides, ServerConfig, StoreKind};

pub mod generate;
pub mod serve;

/// Contract Forge - self-healing smart contract generator
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "Contract Forge - self-healing smart contract generator")]
#[command(long_about = r#"
Contract Forge turns a plain-language description into a MultiversX smart
contract, compiles it, and feeds compiler errors back to the model until the
build passes or the attempt budget runs out.

COMMANDS:
  serve     → Run the HTTP service (default)
  generate  → Run one session in-process and print its events as JSON lines

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Configuration error
  4 - Generation failed
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve(serve::ServeArgs),

    /// Generate one contract without the HTTP service
    Generate(generate::GenerateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorArg {
    Auto,
    Gemini,
    Openai,
    Anthropic,
    Mock,
}

impl From<GeneratorArg> for GeneratorKind {
    fn from(arg: GeneratorArg) -> Self {
        match arg {
            GeneratorArg::Auto => Self::Auto,
            GeneratorArg::Gemini => Self::Gemini,
            GeneratorArg::Openai => Self::OpenAI,
            GeneratorArg::Anthropic => Self::Anthropic,
            GeneratorArg::Mock => Self::Mock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    Auto,
    Pinata,
    Local,
    Memory,
}

impl From<StoreArg> for StoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Auto => Self::Auto,
            StoreArg::Pinata => Self::Pinata,
            StoreArg::Local => Self::Local,
            StoreArg::Memory => Self::Memory,
        }
    }
}

/// Strategy flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct StrategyArgs {
    /// Code generator
    #[arg(long, value_enum)]
    pub generator: Option<GeneratorArg>,

    /// Artifact store
    #[arg(long, value_enum)]
    pub store: Option<StoreArg>,

    /// Compile attempts per session
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Generate and store without compiling
    #[arg(long)]
    pub skip_compile: bool,
}

impl StrategyArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            generator: self.generator.map(Into::into),
            store: self.store.map(Into::into),
            max_attempts: self.max_attempts,
            skip_compile: self.skip_compile,
            ..Default::default()
        }
    }
}

/// Resolve configuration: file, environment, then flags.
pub fn load_config(cli_config: Option<&PathBuf>, overrides: &Overrides) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::load(cli_config.map(PathBuf::as_path))
        .context("configuration error")?;
    config.apply_overrides(overrides);
    config.validate().context("configuration error")?;
    Ok(config)
}
