//! The `burnlink redeem` command. This consumes the token.

use burnlink_core::{Config, RedeemResult};
use clap::Args;

use super::{open_engine, parse_token};

/// Arguments for the `redeem` command.
#[derive(Args, Debug)]
pub struct RedeemArgs {
    /// Token id or full redemption URL
    pub token: String,
}

/// Execute the redeem command.
pub async fn execute(args: RedeemArgs, config: Config) -> anyhow::Result<()> {
    let token = parse_token(&args.token)?;
    let engine = open_engine(&config).await?;

    match engine.redeem(&token).await? {
        RedeemResult::Redirect(url) => println!("redirect: {url}"),
        RedeemResult::Reveal(text) => println!("{text}"),
        RedeemResult::Invalid => anyhow::bail!("Link does not exist"),
        RedeemResult::Expired => anyhow::bail!("Link was already used"),
    }
    Ok(())
}
