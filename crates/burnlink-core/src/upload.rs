//! Upload validation before bytes reach the codec.

use crate::config::{LimitsConfig, UploadConfig};
use crate::error::UploadError;

/// Validates uploaded files by size, file name and content signature.
pub struct UploadValidator {
    max_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    /// Create a new validator from the configured limits and upload rules.
    pub fn new(limits: &LimitsConfig, upload: &UploadConfig) -> Self {
        Self {
            max_bytes: limits.max_upload_bytes(),
            allowed_extensions: upload
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Maximum accepted upload size in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check an upload.
    ///
    /// Checks:
    /// - Content is non-empty and within the size limit
    /// - The file name (when supplied) carries an allowed extension
    /// - The content signature is an image format whose extensions are allowed
    pub fn validate(&self, filename: Option<&str>, bytes: &[u8]) -> Result<(), UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }

        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size_bytes: size,
                max_bytes: self.max_bytes,
            });
        }

        if let Some(name) = filename {
            let extension = name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .ok_or_else(|| UploadError::UnsupportedType {
                    detail: format!("{name:?} has no file extension"),
                })?;
            if !self.is_allowed(&extension) {
                return Err(UploadError::UnsupportedType {
                    detail: format!(".{extension} files are not accepted"),
                });
            }
        }

        let Some(format) = sniff_format(bytes) else {
            return Err(UploadError::UnsupportedType {
                detail: "unrecognized image format (invalid magic bytes)".to_string(),
            });
        };
        if !format_extensions(format).iter().any(|e| self.is_allowed(e)) {
            return Err(UploadError::UnsupportedType {
                detail: format!("{format} images are not accepted"),
            });
        }

        Ok(())
    }

    fn is_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions.iter().any(|e| e == extension)
    }
}

/// Identify an image format from its leading bytes.
fn sniff_format(header: &[u8]) -> Option<&'static str> {
    if header.len() < 4 {
        return None;
    }

    // JPEG: FF D8 FF
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpeg");
    }

    // PNG: 89 50 4E 47
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some("png");
    }

    // GIF: GIF8
    if header.starts_with(b"GIF8") {
        return Some("gif");
    }

    // WebP: RIFF....WEBP
    if header.len() >= 12 && header.starts_with(b"RIFF") && &header[8..12] == b"WEBP" {
        return Some("webp");
    }

    // BMP: BM
    if header.starts_with(b"BM") {
        return Some("bmp");
    }

    None
}

/// File extensions that name a sniffed format.
fn format_extensions(format: &str) -> &'static [&'static str] {
    match format {
        "jpeg" => &["jpg", "jpeg"],
        "png" => &["png"],
        "gif" => &["gif"],
        "webp" => &["webp"],
        "bmp" => &["bmp"],
        _ => &[],
    }
}
