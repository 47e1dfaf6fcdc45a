//! Contract Forge - main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Configuration error
//! - 4: Generation failed

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands, LogFormat};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIG_ERROR: u8 = 3;
    pub const GENERATION_FAILED: u8 = 4;
}

fn init_logging(format: LogFormat, verbose: bool) {
    let mut filter = EnvFilter::from_default_env();
    let level = if verbose { "forge=debug" } else { "forge=info" };
    for directive in [level, "warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Logs go to stderr so `generate` keeps stdout for events.
    let result = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
    };

    if result.is_err() {
        // Logging already initialized, continue
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    let config_path = cli.config.as_ref();
    let result = match cli.command {
        Some(Commands::Serve(args)) => commands::serve::execute(args, config_path).await,
        Some(Commands::Generate(args)) => commands::generate::execute(args, config_path).await,
        None => commands::serve::execute(Default::default(), config_path).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let msg = e.to_string().to_lowercase();

    if msg.contains("configuration") {
        ExitCodes::CONFIG_ERROR
    } else if msg.contains("generation failed") {
        ExitCodes::GENERATION_FAILED
    } else if msg.contains("argument") || msg.contains("invalid request") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let config = anyhow::anyhow!("boom").context("configuration error");
        assert_eq!(categorize_error(&config), ExitCodes::CONFIG_ERROR);

        let failed = anyhow::anyhow!("generation failed: Failed to compile after 3 attempts");
        assert_eq!(categorize_error(&failed), ExitCodes::GENERATION_FAILED);

        let other = anyhow::anyhow!("failed to bind 0.0.0.0:3000");
        assert_eq!(categorize_error(&other), ExitCodes::GENERAL_ERROR);
    }
}
