//! Command handlers.

pub mod config;
pub mod inspect;
pub mod issue;
pub mod redeem;
pub mod serve;

use anyhow::Context;
use burnlink_core::{Config, QrCodec, RedemptionEngine, SqliteTokenStore, TokenId};
use std::sync::Arc;

/// Open the configured token store once and wrap it in an engine.
pub async fn open_engine(config: &Config) -> anyhow::Result<RedemptionEngine> {
    let path = config.store_path();
    let store = SqliteTokenStore::open(&path, &config.store)
        .await
        .with_context(|| format!("Failed to open token store at {}", path.display()))?;
    tracing::debug!("Token store: {}", path.display());

    Ok(RedemptionEngine::new(
        Arc::new(store),
        Arc::new(QrCodec::new(&config.limits)),
        config.limits.clone(),
    ))
}

/// Parse a token argument, accepting a full redemption URL as well as the bare id.
pub fn parse_token(raw: &str) -> anyhow::Result<TokenId> {
    let candidate = raw.trim().trim_end_matches('/');
    let candidate = candidate.rsplit('/').next().unwrap_or(candidate);
    candidate
        .parse()
        .with_context(|| format!("Not a token: {raw:?}"))
}
