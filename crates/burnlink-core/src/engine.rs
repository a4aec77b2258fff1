//! Redemption engine: issuance and one-time redemption.
//!
//! ```text
//! issue:  image → decode → store.create → encode(redemption URL) → IssueResult
//! redeem: token → store.consume_if_unused → classify payload → RedeemResult
//! ```
//!
//! Classification only ever runs on a payload this caller has already
//! consumed. Whether a payload is a URL has no bearing on consumption.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::codec::PayloadCodec;
use crate::config::LimitsConfig;
use crate::error::{CodecError, IssueError, StoreResult};
use crate::store::TokenStore;
use crate::token::{ConsumeResult, TokenId, TokenRecord};

/// Path segment between the base URL and the token.
pub const REDEMPTION_PATH: &str = "qr";

/// What issuance hands back to the presentation layer.
#[derive(Debug, Clone)]
pub struct IssueResult {
    /// Identifier of the newly created token
    pub token: TokenId,
    /// `{base}/qr/{token}`
    pub redemption_url: String,
    /// PNG encoding of `redemption_url`
    pub artifact_png: Vec<u8>,
    /// The payload decoded from the uploaded image
    pub original_payload: String,
}

impl IssueResult {
    /// The artifact as a `data:` URL for inline display.
    pub fn artifact_data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.artifact_png))
    }
}

/// Outcome of a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemResult {
    /// First visit, payload is an HTTP(S) URL
    Redirect(String),
    /// First visit, payload is anything else
    Reveal(String),
    /// The link does not exist
    Invalid,
    /// The link was already used
    Expired,
}

/// Bridges image content, tokens, and redemption outcomes.
pub struct RedemptionEngine {
    store: Arc<dyn TokenStore>,
    codec: Arc<dyn PayloadCodec>,
    limits: LimitsConfig,
}

impl RedemptionEngine {
    /// Create an engine over an already-opened store.
    pub fn new(
        store: Arc<dyn TokenStore>,
        codec: Arc<dyn PayloadCodec>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            store,
            codec,
            limits,
        }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Decode a payload from `image_bytes`, store it under a fresh token and
    /// render the redemption URL as a new QR image.
    ///
    /// The only side effect is the single `create` on the store. Nothing is
    /// written when the image carries no payload.
    pub async fn issue(
        &self,
        image_bytes: Vec<u8>,
        base_url: &str,
    ) -> Result<IssueResult, IssueError> {
        let fingerprint = blake3::hash(&image_bytes).to_hex();
        tracing::debug!(image = %fingerprint, bytes = image_bytes.len(), "Issuing token");

        let payload = self
            .decode(image_bytes)
            .await?
            .ok_or(IssueError::NoPayloadFound)?;

        let token = self.store.create(&payload).await?;
        let redemption_url = redemption_url(base_url, &token);
        let artifact_png = self.encode(redemption_url.clone()).await?;

        tracing::info!(
            token = %token.fingerprint(),
            image = %fingerprint,
            payload_len = payload.len(),
            "Issued redemption link"
        );

        Ok(IssueResult {
            token,
            redemption_url,
            artifact_png,
            original_payload: payload,
        })
    }

    /// Consume `id` and decide what the visitor sees.
    ///
    /// Store failures are returned as errors and never folded into
    /// `Invalid` or `Expired`.
    pub async fn redeem(&self, id: &TokenId) -> StoreResult<RedeemResult> {
        let result = match self.store.consume_if_unused(id).await? {
            ConsumeResult::NotFound => RedeemResult::Invalid,
            ConsumeResult::AlreadyConsumed => RedeemResult::Expired,
            ConsumeResult::Consumed(payload) => classify(payload),
        };

        let token = id.fingerprint();
        match &result {
            RedeemResult::Redirect(_) => tracing::info!(%token, "Redeemed (redirect)"),
            RedeemResult::Reveal(_) => tracing::info!(%token, "Redeemed (reveal)"),
            RedeemResult::Invalid => tracing::info!(%token, "Redemption of unknown token"),
            RedeemResult::Expired => tracing::info!(%token, "Replay of consumed token"),
        }
        Ok(result)
    }

    /// Non-mutating read for diagnostics.
    pub async fn lookup(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        self.store.lookup(id).await
    }

    async fn decode(&self, image_bytes: Vec<u8>) -> Result<Option<String>, CodecError> {
        let codec = Arc::clone(&self.codec);
        let timeout_ms = self.limits.decode_timeout_ms;

        let decoded = timeout(
            Duration::from_millis(timeout_ms),
            tokio::task::spawn_blocking(move || codec.decode(&image_bytes)),
        )
        .await
        .map_err(|_| CodecError::Timeout {
            stage: "decode",
            timeout_ms,
        })?;

        match decoded {
            Ok(payload) => Ok(payload),
            Err(e) => {
                // A codec that panics on hostile input still just has no payload
                tracing::warn!("QR decode task failed: {e}");
                Ok(None)
            }
        }
    }

    async fn encode(&self, text: String) -> Result<Vec<u8>, CodecError> {
        let codec = Arc::clone(&self.codec);
        let timeout_ms = self.limits.encode_timeout_ms;

        timeout(
            Duration::from_millis(timeout_ms),
            tokio::task::spawn_blocking(move || codec.encode(&text)),
        )
        .await
        .map_err(|_| CodecError::Timeout {
            stage: "encode",
            timeout_ms,
        })?
        .map_err(|e| CodecError::Encode(format!("Task join error: {e}")))?
    }
}

/// Build `{base}/qr/{id}`, tolerating a trailing slash on `base`.
pub fn redemption_url(base_url: &str, id: &TokenId) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        REDEMPTION_PATH,
        id
    )
}

/// Whether `payload` is an absolute HTTP or HTTPS URL (scheme is case-insensitive).
pub fn is_http_url(payload: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        payload
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Decide redirect vs. reveal for a consumed payload.
pub fn classify(payload: String) -> RedeemResult {
    if is_http_url(&payload) {
        RedeemResult::Redirect(payload)
    } else {
        RedeemResult::Reveal(payload)
    }
}
