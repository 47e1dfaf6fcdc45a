//! `forge generate`: run one session in-process.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use forge_core::{GenerationRequest, ProgressEvent};
use forge_server::AppState;
use tokio::sync::mpsc;

use super::{load_config, StrategyArgs};

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// What the contract should do
    #[arg(short, long)]
    pub description: String,

    /// Contract category (token, nft, staking, dao, ...)
    #[arg(short = 't', long, default_value = "token")]
    pub category: String,

    /// Session identifier
    #[arg(long)]
    pub session_id: Option<String>,

    /// Recorded as the artifact's creator
    #[arg(long, default_value = "cli")]
    pub creator: String,

    #[command(flatten)]
    pub strategy: StrategyArgs,
}

pub async fn execute(args: GenerateArgs, config_path: Option<&PathBuf>) -> Result<()> {
    let config = load_config(config_path, &args.strategy.overrides())?;
    let state = AppState::from_config(&config).context("configuration error: setup failed")?;

    let session_id = args
        .session_id
        .unwrap_or_else(|| format!("cli-{}", chrono::Utc::now().timestamp_millis()));
    let request = GenerationRequest::new(session_id.clone(), args.description, args.category)
        .with_creator(args.creator);

    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    state.stream().attach(&session_id, std::sync::Arc::new(tx));
    let printer = tokio::spawn(async move {
        let stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                let mut out = stdout.lock();
                let _ = writeln!(out, "{}", line);
            }
        }
    });

    let handle = state.launcher.start(request)?;
    let result = handle.wait().await?;

    state.stream().detach(&session_id);
    printer.await.context("event printer failed")?;

    if !result.success {
        let reason = result
            .error
            .or_else(|| result.payload.and_then(|p| p.error))
            .unwrap_or_else(|| "unknown failure".to_string());
        bail!("generation failed: {}", reason);
    }
    if let Some(cid) = result.payload.as_ref().and_then(|p| p.ipfs_hash.as_deref()) {
        eprintln!("✓ Stored as {}", cid);
    }
    Ok(())
}
