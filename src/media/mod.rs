// SPDX-License-Identifier: GPL-3.0-only

//! Still image handling
//!
//! - [`image_buffer`]: the data-URL encoded image value
//! - [`encoding`]: raw frame to JPEG conversion
//! - [`source`]: acquisition from a live frame or an uploaded file

pub mod encoding;
pub mod image_buffer;
pub mod source;

pub use encoding::{EncodedImage, FrameEncoder};
pub use image_buffer::{DataUrlError, ImageBuffer};
pub use source::FileUpload;
