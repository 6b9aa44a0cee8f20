// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion for raw camera frames
//!
//! Frames that are not already JPEG are converted to packed RGB before
//! encoding.

/// Convert YUYV (YUV 4:2:2) to RGB
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            if rgb.len() >= pixel_count * 3 {
                break;
            }
            rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
        }
    }

    rgb
}

/// Drop the alpha channel from RGBA
pub fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }
    rgb
}

/// Expected byte length of a raw frame, `None` for compressed formats
pub fn expected_len(format: super::PixelFormat, width: u32, height: u32) -> Option<usize> {
    let pixels = width as usize * height as usize;
    match format {
        super::PixelFormat::Rgba => Some(pixels * 4),
        super::PixelFormat::Rgb => Some(pixels * 3),
        super::PixelFormat::Yuyv => Some(pixels * 2),
        super::PixelFormat::Mjpeg => None,
    }
}
