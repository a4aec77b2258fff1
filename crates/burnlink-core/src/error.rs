//! Error types for burnlink.
//!
//! Errors are split by the component that raises them so the transport can
//! pick its wording per outcome. Replays and unknown tokens are not errors;
//! they are ordinary [`RedeemResult`](crate::engine::RedeemResult) variants.

use thiserror::Error;

/// Top-level error type for burnlink operations.
#[derive(Error, Debug)]
pub enum BurnlinkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Issuance errors
    #[error("Issue error: {0}")]
    Issue(#[from] IssueError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Token store errors.
///
/// `Unavailable` and `Timeout` are both infrastructure failures. Callers must
/// never report them as "link already used".
#[derive(Error, Debug)]
pub enum StoreError {
    /// The durable medium rejected or failed the operation
    #[error("Token store unavailable during {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// The operation did not complete within the configured bound
    #[error("Token store timed out during {operation} after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Every generated identifier collided with an existing record
    #[error("Could not allocate a unique token identifier after {attempts} attempts")]
    IdentifierExhausted { attempts: u32 },

    /// Schema setup failed when opening the store
    #[error("Token store migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether this is a transient infrastructure failure the caller may retry.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Payload codec errors.
///
/// Decoding never errors (an unreadable image simply has no payload); only
/// encoding and the time bounds around codec work can fail.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Rendering the redemption URL to an image failed
    #[error("QR encode failed: {0}")]
    Encode(String),

    /// Codec work exceeded its time bound
    #[error("QR {stage} timed out after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },
}

/// Errors from [`RedemptionEngine::issue`](crate::engine::RedemptionEngine::issue).
#[derive(Error, Debug)]
pub enum IssueError {
    /// The uploaded image did not contain a readable payload
    #[error("No QR payload found in image")]
    NoPayloadFound,

    /// The token could not be persisted
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The redemption artifact could not be produced
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Upload validation errors, raised before bytes reach the codec.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    /// No file content was supplied
    #[error("No file selected")]
    Empty,

    /// Upload exceeds the configured size limit
    #[error("File too large ({size_bytes} bytes > {max_bytes} bytes)")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    /// File name or content is not an accepted image type
    #[error("Unsupported file type: {detail}")]
    UnsupportedType { detail: String },
}

/// Convenience type alias for burnlink results.
pub type Result<T> = std::result::Result<T, BurnlinkError>;

/// Convenience type alias for store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        let err = StoreError::Unavailable {
            operation: "consume",
            message: "disk I/O error".to_string(),
        };
        assert!(err.is_unavailable());

        let err = StoreError::Timeout {
            operation: "create",
            timeout_ms: 5000,
        };
        assert!(err.is_unavailable());

        let err = StoreError::IdentifierExhausted { attempts: 5 };
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_issue_error_is_transparent_over_store() {
        let err: IssueError = StoreError::IdentifierExhausted { attempts: 3 }.into();
        assert_eq!(
            err.to_string(),
            "Could not allocate a unique token identifier after 3 attempts"
        );
    }
}
