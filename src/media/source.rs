// SPDX-License-Identifier: GPL-3.0-only

//! Image acquisition from a live frame or a user-supplied file
//!
//! These are the only producers of [`ImageBuffer`] values. A rejected
//! acquisition returns an error and never reaches analysis.

use super::encoding::FrameEncoder;
use super::image_buffer::ImageBuffer;
use crate::backends::camera::CameraFrame;
use crate::constants::file_formats::{FALLBACK_MIME, mime_for_extension};
use crate::errors::AcquisitionError;
use std::path::Path;
use tracing::{debug, info};

/// A file handed over by the file input, with the type it claims to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub bytes: Vec<u8>,
    pub declared_mime: String,
    pub name: Option<String>,
}

impl FileUpload {
    pub fn new(bytes: Vec<u8>, declared_mime: impl Into<String>) -> Self {
        Self {
            bytes,
            declared_mime: declared_mime.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Convert the current live frame into an image buffer
///
/// Fails with `frame-not-ready` when the frame has no pixels yet.
pub fn from_capture(
    frame: &CameraFrame,
    encoder: &FrameEncoder,
) -> Result<ImageBuffer, AcquisitionError> {
    if !frame.dimensions().is_ready() {
        return Err(AcquisitionError::FrameNotReady {
            width: frame.width,
            height: frame.height,
        });
    }

    let encoded = encoder.encode(frame)?;
    info!(
        width = frame.width,
        height = frame.height,
        size = encoded.data.len(),
        "Captured still from live frame"
    );
    Ok(ImageBuffer::from_bytes(encoded.mime, &encoded.data))
}

/// Accept an uploaded file if it declares an image type
pub fn from_file(upload: &FileUpload) -> Result<ImageBuffer, AcquisitionError> {
    let mime = normalize_image_mime(&upload.declared_mime).ok_or_else(|| {
        AcquisitionError::InvalidFileType {
            declared: upload.declared_mime.clone(),
        }
    })?;
    if upload.bytes.is_empty() {
        return Err(AcquisitionError::EmptyFile);
    }

    info!(
        name = upload.name.as_deref().unwrap_or("<unnamed>"),
        mime = %mime,
        size = upload.bytes.len(),
        "Accepted image file"
    );
    Ok(ImageBuffer::from_bytes(mime, &upload.bytes))
}

/// Bare lowercase `image/<subtype>`, parameters dropped
///
/// `None` when the type is not an image or the subtype is empty or would
/// break the data URL framing.
fn normalize_image_mime(declared: &str) -> Option<String> {
    let essence = declared.split(';').next().unwrap_or_default().trim();
    let mime = essence.to_ascii_lowercase();
    let subtype = mime.strip_prefix("image/")?;
    let valid = !subtype.is_empty()
        && !subtype
            .chars()
            .any(|c| c == ',' || c == ';' || c == '/' || c.is_whitespace());
    valid.then_some(mime)
}

/// Read a file from disk and declare its type
///
/// The extension decides first; unknown extensions fall back to sniffing the
/// content, then to `application/octet-stream` (which `from_file` rejects).
pub async fn read_path(path: &Path) -> Result<FileUpload, AcquisitionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AcquisitionError::Read(format!("{}: {}", path.display(), e)))?;

    let declared = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
        .map(str::to_string)
        .unwrap_or_else(|| sniff_mime(&bytes));

    debug!(path = %path.display(), mime = %declared, "Declared file type");

    let mut upload = FileUpload::new(bytes, declared);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        upload = upload.with_name(name);
    }
    Ok(upload)
}

fn sniff_mime(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PixelFormat;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_from_file_accepts_image() {
        let upload = FileUpload::new(PNG_MAGIC.to_vec(), "image/png").with_name("cat.png");
        let image = from_file(&upload).unwrap();
        assert_eq!(image.mime(), "image/png");
        assert_eq!(image.decode().unwrap(), PNG_MAGIC);
    }

    #[test]
    fn test_from_file_rejects_non_image() {
        let upload = FileUpload::new(b"hello".to_vec(), "text/plain");
        let err = from_file(&upload).unwrap_err();
        assert_eq!(err.kind().as_str(), "invalid-file-type");
    }

    #[test]
    fn test_from_file_drops_mime_parameters() {
        for declared in ["image/png; charset=binary", "IMAGE/PNG", "image/png;base64,zz"] {
            let upload = FileUpload::new(PNG_MAGIC.to_vec(), declared);
            let image = from_file(&upload).unwrap();
            assert_eq!(image.mime(), "image/png", "declared {}", declared);

            let parsed = ImageBuffer::parse(&image.to_data_url()).unwrap();
            assert_eq!(parsed, image);
            assert_eq!(parsed.decode().unwrap(), PNG_MAGIC);
        }
    }

    #[test]
    fn test_from_file_rejects_malformed_image_mime() {
        for declared in ["image/", "image/;x=1", "image/a,b", "image/a b", " ;image/png"] {
            let upload = FileUpload::new(PNG_MAGIC.to_vec(), declared);
            assert!(
                matches!(
                    from_file(&upload),
                    Err(AcquisitionError::InvalidFileType { .. })
                ),
                "declared {}",
                declared
            );
        }
    }

    #[test]
    fn test_from_file_rejects_empty() {
        let upload = FileUpload::new(Vec::new(), "image/png");
        assert_eq!(from_file(&upload), Err(AcquisitionError::EmptyFile));
    }

    #[test]
    fn test_from_capture_requires_pixels() {
        let frame = CameraFrame::new(0, 0, PixelFormat::Rgba, Vec::new());
        let err = from_capture(&frame, &FrameEncoder::default()).unwrap_err();
        assert_eq!(
            err,
            AcquisitionError::FrameNotReady {
                width: 0,
                height: 0
            }
        );
    }

    #[test]
    fn test_sniff_png() {
        assert_eq!(sniff_mime(PNG_MAGIC), "image/png");
        assert_eq!(sniff_mime(b"plain text"), FALLBACK_MIME);
    }

    #[tokio::test]
    async fn test_read_path_uses_extension() {
        let path = std::env::temp_dir().join(format!("insight-{}.jpg", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).await.unwrap();

        let upload = read_path(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(upload.declared_mime, "image/jpeg");
        assert!(upload.name.unwrap().ends_with(".jpg"));
    }
}
