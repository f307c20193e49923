// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding of still frames
//!
//! Encoding is CPU-bound and writing is I/O-bound; both run on the capture
//! executor thread, never on the UI thread.

use crate::backends::camera::format_converters::frame_to_rgb_image;
use crate::backends::camera::types::CameraFrame;
use crate::errors::PhotoError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Turns still frames into JPEG files
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoEncoder {
    quality: EncodingQuality,
}

impl PhotoEncoder {
    pub fn new(quality: EncodingQuality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> EncodingQuality {
        self.quality
    }

    /// Encode an RGB image as JPEG
    pub fn encode_jpeg(&self, image: &RgbImage) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut cursor,
            self.quality.jpeg_quality(),
        );

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        debug!(
            width = image.width(),
            height = image.height(),
            bytes = buffer.len(),
            quality = self.quality.jpeg_quality(),
            "Encoded JPEG"
        );
        Ok(buffer)
    }

    /// Convert, encode and write `frame` to `path`.
    ///
    /// Digital zoom carried by the frame is applied. A partially written file
    /// is removed on failure.
    pub fn save_frame(&self, frame: &CameraFrame, path: &Path) -> Result<(), PhotoError> {
        let image = frame_to_rgb_image(frame).ok_or_else(|| {
            PhotoError::EncodingFailed(format!(
                "unusable {}x{} {:?} frame",
                frame.width, frame.height, frame.format
            ))
        })?;
        let data = self.encode_jpeg(&image)?;

        info!(path = %path.display(), "Saving photo");
        if let Err(e) = std::fs::write(path, &data) {
            if path.exists()
                && let Err(remove_err) = std::fs::remove_file(path)
            {
                warn!(path = %path.display(), error = %remove_err, "Failed to remove partial photo");
            }
            return Err(e.into());
        }
        info!(path = %path.display(), bytes = data.len(), "Photo saved successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Medium.jpeg_quality(), 80);
        assert_eq!(EncodingQuality::High.jpeg_quality(), 92);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 98);
        assert_eq!(EncodingQuality::default(), EncodingQuality::High);
    }

    #[test]
    fn test_encode_jpeg_decodes_back() {
        let image = RgbImage::from_fn(32, 24, |x, y| image::Rgb([x as u8 * 8, y as u8 * 10, 128]));
        let bytes = PhotoEncoder::new(EncodingQuality::Medium)
            .encode_jpeg(&image)
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_quality_serializes_by_name() {
        let json = serde_json::to_string(&EncodingQuality::Maximum).unwrap();
        assert_eq!(json, "\"Maximum\"");
    }
}
