//! The image/text boundary.
//!
//! A codec turns uploaded images into candidate payloads and renders
//! redemption URLs back into images. It knows nothing about tokens.

pub mod qr;

pub use qr::QrCodec;

use crate::error::CodecError;

/// Decode/encode contract consumed by the redemption engine.
///
/// Both methods are synchronous and CPU-bound; the engine runs them on the
/// blocking pool under a time bound.
pub trait PayloadCodec: Send + Sync {
    /// Extract a text payload from raw image bytes.
    ///
    /// Malformed or unreadable images yield `None`, never a panic or error.
    fn decode(&self, image: &[u8]) -> Option<String>;

    /// Render `text` as PNG bytes.
    fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError>;
}
