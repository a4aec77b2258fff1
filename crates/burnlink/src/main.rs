//! burnlink CLI - single-use redemption links minted from scanned QR images.
//!
//! Upload a QR image, get back a new QR whose link works exactly once.
//!
//! # Usage
//!
//! ```bash
//! # Run the web service
//! burnlink serve --bind 0.0.0.0:5000
//!
//! # Issue a link from a local image
//! burnlink issue code.png --base-url https://qr.example.org --output once.png
//!
//! # Look at a token without consuming it
//! burnlink inspect 0123456789abcdef0123456789abcdef
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;
mod server;

/// burnlink - single-use redemption links minted from scanned QR images.
#[derive(Parser, Debug)]
#[command(name = "burnlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "BURNLINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP upload and redemption service
    Serve(cli::serve::ServeArgs),

    /// Issue a single-use link from a QR image file
    Issue(cli::issue::IssueArgs),

    /// Redeem (consume) a token from the command line
    Redeem(cli::redeem::RedeemArgs),

    /// Show a token record without consuming it
    Inspect(cli::inspect::InspectArgs),

    /// Show token counts
    Stats,

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let loaded = match &cli.config {
        Some(path) => burnlink_core::Config::load_from(path),
        None => burnlink_core::Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) if cli.config.is_some() => return Err(e.into()),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `burnlink config path`."
            );
            burnlink_core::Config::default()
        }
    };
    logging::init(&logging::LogSettings::resolve(&config, cli.verbose, cli.json_logs));

    tracing::debug!("burnlink v{}", burnlink_core::VERSION);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Issue(args) => cli::issue::execute(args, config).await,
        Commands::Redeem(args) => cli::redeem::execute(args, config).await,
        Commands::Inspect(args) => cli::inspect::execute(args, config).await,
        Commands::Stats => cli::inspect::stats(config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
    }
}
