// SPDX-License-Identifier: GPL-3.0-only

//! Frame encoding
//!
//! Raw camera frames are turned into JPEG before submission. MJPEG frames are
//! already JPEG and pass through untouched.

use crate::backends::camera::format_converters::{expected_len, rgba_to_rgb, yuyv_to_rgb};
use crate::backends::camera::{CameraFrame, PixelFormat};
use crate::constants::capture::DEFAULT_JPEG_QUALITY;
use crate::errors::AcquisitionError;
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";

/// Encoded still image bytes plus their media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: &'static str,
    pub data: Vec<u8>,
}

/// Converts camera frames into a submittable image format
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    jpeg_quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Encode a frame, converting raw layouts to JPEG
    pub fn encode(&self, frame: &CameraFrame) -> Result<EncodedImage, AcquisitionError> {
        if let Some(expected) = expected_len(frame.format, frame.width, frame.height)
            && frame.data.len() < expected
        {
            return Err(AcquisitionError::Conversion(format!(
                "{} frame {}x{} needs {} bytes, got {}",
                frame.format,
                frame.width,
                frame.height,
                expected,
                frame.data.len()
            )));
        }

        let rgb = match frame.format {
            PixelFormat::Mjpeg => {
                return Ok(EncodedImage {
                    mime: JPEG_MIME,
                    data: frame.data.to_vec(),
                });
            }
            PixelFormat::Rgb => frame.data.to_vec(),
            PixelFormat::Rgba => rgba_to_rgb(&frame.data),
            PixelFormat::Yuyv => yuyv_to_rgb(&frame.data, frame.width, frame.height),
        };

        let data = self.encode_jpeg(&rgb, frame.width, frame.height)?;
        debug!(
            format = %frame.format,
            width = frame.width,
            height = frame.height,
            size = data.len(),
            "Frame encoded as JPEG"
        );

        Ok(EncodedImage {
            mime: JPEG_MIME,
            data,
        })
    }

    fn encode_jpeg(&self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AcquisitionError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, self.jpeg_quality);

        encoder
            .encode(rgb, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| AcquisitionError::Conversion(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }
}
