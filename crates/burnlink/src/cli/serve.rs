//! The `burnlink serve` command: run the HTTP service.

use anyhow::Context;
use burnlink_core::{Config, UploadValidator};
use clap::Args;

use super::open_engine;
use crate::server::{build_router, AppState};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long, env = "BURNLINK_BIND")]
    pub bind: Option<String>,

    /// Public base URL for redemption links (overrides server.public_base_url)
    #[arg(long, env = "BURNLINK_BASE_URL")]
    pub base_url: Option<String>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, config: Config) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let base_url = args.base_url.or_else(|| config.server.public_base_url.clone());

    // The store is opened once here and shared by every request.
    let engine = open_engine(&config).await?;
    let validator = UploadValidator::new(&config.limits, &config.upload);
    let state = AppState::new(engine, validator, base_url);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
