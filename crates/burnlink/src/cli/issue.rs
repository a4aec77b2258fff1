//! The `burnlink issue` command: mint a link from a local image.

use anyhow::Context;
use burnlink_core::{Config, IssueError, UploadValidator};
use clap::Args;
use std::path::PathBuf;

use super::open_engine;

/// Arguments for the `issue` command.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// QR image to read
    #[arg(required = true)]
    pub input: PathBuf,

    /// Base URL for the redemption link (defaults to server.public_base_url)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Where to write the new QR image (defaults to burnlink-<fingerprint>.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the issue command.
pub async fn execute(args: IssueArgs, config: Config) -> anyhow::Result<()> {
    let base_url = args
        .base_url
        .or_else(|| config.server.public_base_url.clone())
        .context("No base URL: pass --base-url or set server.public_base_url")?;

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let file_name = args.input.file_name().and_then(|n| n.to_str());
    UploadValidator::new(&config.limits, &config.upload).validate(file_name, &bytes)?;

    let engine = open_engine(&config).await?;
    let issued = match engine.issue(bytes, &base_url).await {
        Ok(issued) => issued,
        Err(IssueError::NoPayloadFound) => anyhow::bail!(
            "No readable QR code found in {}. Make sure the image is sharp and well lit.",
            args.input.display()
        ),
        Err(e) => return Err(e.into()),
    };

    // The token itself stays out of the file name
    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!("burnlink-{}.png", issued.token.fingerprint()))
    });
    std::fs::write(&output, &issued.artifact_png)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!("Wrote single-use QR to {}", output.display());
    println!("{}", issued.redemption_url);
    Ok(())
}
