//! burnlink core - single-use redemption links for scanned QR content.
//!
//! An uploaded image is decoded to a text payload, the payload is stored
//! under an unguessable token, and a new QR image encoding the redemption
//! URL for that token is returned. The first visit to the redemption URL
//! consumes the token; every later visit is rejected.
//!
//! # Architecture
//!
//! ```text
//! Image → Codec.decode → Store.create → Codec.encode({base}/qr/{token}) → IssueResult
//! Token → Store.consume_if_unused → classify → RedeemResult
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use burnlink_core::{Config, QrCodec, RedemptionEngine, SqliteTokenStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> burnlink_core::Result<()> {
//!     let config = Config::load()?;
//!     let store = SqliteTokenStore::open(&config.store_path(), &config.store).await?;
//!     let engine = RedemptionEngine::new(
//!         Arc::new(store),
//!         Arc::new(QrCodec::new(&config.limits)),
//!         config.limits.clone(),
//!     );
//!
//!     let issued = engine.issue(std::fs::read("code.png")?, "https://qr.example.org").await?;
//!     println!("{}", issued.redemption_url);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod token;
pub mod upload;

// Re-exports for convenient access
pub use codec::{PayloadCodec, QrCodec};
pub use config::Config;
pub use engine::{IssueResult, RedeemResult, RedemptionEngine};
pub use error::{
    BurnlinkError, CodecError, ConfigError, IssueError, Result, StoreError, StoreResult,
    UploadError,
};
pub use store::{MemoryTokenStore, SqliteTokenStore, StoreStats, TokenStore};
pub use token::{ConsumeResult, InvalidTokenId, TokenId, TokenRecord};
pub use upload::UploadValidator;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
