//! Read-only diagnostics: `burnlink inspect` and `burnlink stats`.

use burnlink_core::Config;
use clap::Args;

use super::{open_engine, parse_token};

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Token id or full redemption URL
    pub token: String,
}

/// Print a token record as JSON without consuming it.
pub async fn execute(args: InspectArgs, config: Config) -> anyhow::Result<()> {
    let token = parse_token(&args.token)?;
    let engine = open_engine(&config).await?;

    let Some(record) = engine.lookup(&token).await? else {
        anyhow::bail!("No such token: {token}");
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Print issued/consumed counts as JSON.
pub async fn stats(config: Config) -> anyhow::Result<()> {
    let engine = open_engine(&config).await?;
    let stats = engine.store().stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
