//! Token identifiers and the persisted token record.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of random bytes behind each identifier (128 bits).
const TOKEN_BYTES: usize = 16;

/// Length of the string form: two hex digits per byte.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// Hex digits kept from the identifier's digest in log fields.
const FINGERPRINT_LEN: usize = 12;

/// An unguessable, URL-safe token identifier.
///
/// The string form is 32 lowercase hex characters with no structure
/// callers may parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Draw a fresh identifier from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short one-way digest of the identifier, safe to write to logs.
    ///
    /// The identifier itself is a bearer credential and must never be logged.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.0.as_bytes()).to_hex().as_str()[..FINGERPRINT_LEN].to_string()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A string that is not a well-formed token identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid token identifier: expected 32 hex characters")]
pub struct InvalidTokenId;

impl FromStr for TokenId {
    type Err = InvalidTokenId;

    /// Accepts hex in either case and normalizes to lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TOKEN_LEN {
            return Err(InvalidTokenId);
        }
        hex::decode(s).map_err(|_| InvalidTokenId)?;
        Ok(Self(s.to_ascii_lowercase()))
    }
}

/// A persisted token and the payload it guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Lookup key
    pub id: TokenId,

    /// Decoded text from the source image (may itself be a URL)
    pub payload: String,

    /// Set exactly once, on first redemption
    pub consumed: bool,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// When the token was redeemed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// A fresh, unconsumed record.
    pub fn new(id: TokenId, payload: impl Into<String>) -> Self {
        Self {
            id,
            payload: payload.into(),
            consumed: false,
            created_at: Utc::now(),
            consumed_at: None,
        }
    }
}

/// Outcome of an atomic check-and-mark on a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeResult {
    /// This caller flipped the token and may act on the payload
    Consumed(String),
    /// Another caller already redeemed the token
    AlreadyConsumed,
    /// No token with this identifier exists
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_shape() {
        let id = TokenId::generate();
        assert_eq!(id.as_str().len(), TOKEN_LEN);
        assert!(id
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn test_generate_is_unique() {
        let ids: HashSet<TokenId> = (0..1000).map(|_| TokenId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_parse_normalizes_case() {
        let id: TokenId = "0123456789ABCDEF0123456789abcdef".parse().unwrap();
        assert_eq!(id.as_str(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<TokenId>().is_err());
        assert!("0123456789abcdef".parse::<TokenId>().is_err());
        assert!("0123456789abcdef0123456789abcdeg".parse::<TokenId>().is_err());
        assert!("0123456789abcdef0123456789abcdef0".parse::<TokenId>().is_err());
        // Hyphenated UUIDs are not token identifiers
        assert!("550e8400-e29b-41d4-a716-446655440000"
            .parse::<TokenId>()
            .is_err());
        // Multi-byte characters must not slip through the length check
        assert!("é23456789abcdef0123456789abcdef".parse::<TokenId>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let id = TokenId::generate();
        let parsed: TokenId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_fingerprint_does_not_reveal_id() {
        let id: TokenId = "0123456789abcdef0123456789abcdef".parse().unwrap();
        let fingerprint = id.fingerprint();
        assert_eq!(fingerprint.len(), 12);
        assert!(!id.as_str().contains(&fingerprint));
        assert_eq!(fingerprint, id.fingerprint());
        assert_ne!(fingerprint, TokenId::generate().fingerprint());
    }

    #[test]
    fn test_new_record_is_unconsumed() {
        let record = TokenRecord::new(TokenId::generate(), "hello");
        assert!(!record.consumed);
        assert!(record.consumed_at.is_none());
        assert_eq!(record.payload, "hello");
    }
}
