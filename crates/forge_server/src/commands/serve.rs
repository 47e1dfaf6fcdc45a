//! `forge serve`: run the HTTP service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use forge_server::{router, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{load_config, StrategyArgs};

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    #[command(flatten)]
    pub strategy: StrategyArgs,
}

pub async fn execute(args: ServeArgs, config_path: Option<&PathBuf>) -> Result<()> {
    let mut overrides = args.strategy.overrides();
    overrides.host = args.host;
    overrides.port = args.port;
    let config = load_config(config_path, &overrides)?;

    let state = AppState::from_config(&config).context("configuration error: service setup failed")?;

    match state.store().check().await {
        Ok(()) => info!(store = state.store().name(), "Artifact store reachable"),
        Err(e) => warn!(store = state.store().name(), "Artifact store check failed: {}", e),
    }

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("🚀 Contract Forge listening on http://{}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
