//! QR codec: `rqrr` for detection, `qrcode` for generation, `image` for pixels.

use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Limits, Luma};
use qrcode::{Color, QrCode};
use std::io::Cursor;

use super::PayloadCodec;
use crate::config::LimitsConfig;
use crate::error::CodecError;

/// Pixels per QR module in generated images.
const MODULE_PX: u32 = 10;

/// Light modules around the symbol, as recommended for scanners.
const QUIET_ZONE: u32 = 4;

/// Reads and writes QR codes.
pub struct QrCodec {
    max_image_dimension: u32,
}

impl QrCodec {
    /// Create a codec that refuses to decode images larger than the configured limit.
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_image_dimension: limits.max_image_dimension,
        }
    }

    fn load_greyscale(&self, bytes: &[u8]) -> Option<GrayImage> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?;
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_image_dimension);
        limits.max_image_height = Some(self.max_image_dimension);
        reader.limits(limits);

        match reader.decode() {
            Ok(image) => Some(image.to_luma8()),
            Err(e) => {
                tracing::debug!("Image not decodable: {e}");
                None
            }
        }
    }
}

impl PayloadCodec for QrCodec {
    fn decode(&self, image: &[u8]) -> Option<String> {
        let luma = self.load_greyscale(image)?;
        let (width, height) = luma.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32).0[0]
            });

        let grids = prepared.detect_grids();
        tracing::trace!(grids = grids.len(), "QR grids detected");
        for grid in grids {
            match grid.decode() {
                Ok((_, content)) if !content.is_empty() => return Some(content),
                Ok(_) => {}
                Err(e) => tracing::debug!("QR grid failed to decode: {e:?}"),
            }
        }
        None
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        let code = QrCode::new(text.as_bytes()).map_err(|e| CodecError::Encode(e.to_string()))?;
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + 2 * QUIET_ZONE) * MODULE_PX;

        let image = GrayImage::from_fn(side, side, |x, y| {
            let (mx, my) = (x / MODULE_PX, y / MODULE_PX);
            let inside = (QUIET_ZONE..QUIET_ZONE + modules).contains(&mx)
                && (QUIET_ZONE..QUIET_ZONE + modules).contains(&my);
            if inside {
                let index = ((my - QUIET_ZONE) * modules + (mx - QUIET_ZONE)) as usize;
                if colors[index] == Color::Dark {
                    return Luma([0]);
                }
            }
            Luma([255])
        });

        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(image)
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}
