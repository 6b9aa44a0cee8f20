// SPDX-License-Identifier: GPL-3.0-only

//! Still image value passed from acquisition to analysis
//!
//! Images travel as self-describing data URLs, `data:<mime>;base64,<payload>`.
//! An [`ImageBuffer`] is immutable: a new capture produces a new value and the
//! previous one is simply dropped.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::str::FromStr;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Error parsing a data URL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUrlError {
    #[error("missing 'data:' scheme")]
    MissingScheme,
    #[error("missing ';base64,' marker")]
    NotBase64,
    #[error("empty media type")]
    EmptyMediaType,
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// Encoded still image with its declared media type
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    mime: String,
    payload: String,
}

impl ImageBuffer {
    /// Encode raw bytes under the given media type
    pub fn from_bytes(mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime: mime.into(),
            payload: STANDARD.encode(bytes),
        }
    }

    /// Parse `data:<mime>;base64,<payload>`
    ///
    /// The payload is validated but kept in its encoded form.
    pub fn parse(data_url: &str) -> Result<Self, DataUrlError> {
        let rest = data_url
            .strip_prefix(SCHEME)
            .ok_or(DataUrlError::MissingScheme)?;
        let (mime, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or(DataUrlError::NotBase64)?;

        if mime.is_empty() {
            return Err(DataUrlError::EmptyMediaType);
        }

        STANDARD
            .decode(payload)
            .map_err(|e| DataUrlError::InvalidPayload(e.to_string()))?;

        Ok(Self {
            mime: mime.to_string(),
            payload: payload.to_string(),
        })
    }

    /// Declared media type, e.g. `image/jpeg`
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Base64 payload without the data URL prefix
    pub fn base64_payload(&self) -> &str {
        &self.payload
    }

    /// Decode the payload back into raw bytes
    pub fn decode(&self) -> Result<Vec<u8>, DataUrlError> {
        STANDARD
            .decode(&self.payload)
            .map_err(|e| DataUrlError::InvalidPayload(e.to_string()))
    }

    /// Full data URL form
    pub fn to_data_url(&self) -> String {
        format!("{SCHEME}{}{BASE64_MARKER}{}", self.mime, self.payload)
    }

    /// Approximate decoded size in bytes
    pub fn byte_len(&self) -> usize {
        self.payload.len() / 4 * 3
    }
}

impl FromStr for ImageBuffer {
    type Err = DataUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_data_url())
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImageBuffer({}, {} base64 chars)",
            self.mime,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_round_trip() {
        let samples: [(&str, &[u8]); 4] = [
            ("image/png", &[0x89, b'P', b'N', b'G', 0, 255]),
            ("image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]),
            ("image/webp", &[]),
            ("image/svg+xml", b"<svg/>"),
        ];

        for (mime, bytes) in samples {
            let image = ImageBuffer::from_bytes(mime, bytes);
            let parsed = ImageBuffer::parse(&image.to_data_url()).unwrap();
            assert_eq!(parsed.mime(), mime);
            assert_eq!(parsed.base64_payload(), image.base64_payload());
            assert_eq!(parsed.decode().unwrap(), bytes);
        }
    }

    #[test]
    fn test_data_url_shape() {
        let image = ImageBuffer::from_bytes("image/png", b"abc");
        assert_eq!(image.to_data_url(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(
            ImageBuffer::parse("image/png;base64,YWJj"),
            Err(DataUrlError::MissingScheme)
        );
        assert_eq!(
            ImageBuffer::parse("data:image/png,abc"),
            Err(DataUrlError::NotBase64)
        );
        assert_eq!(
            ImageBuffer::parse("data:;base64,YWJj"),
            Err(DataUrlError::EmptyMediaType)
        );
        assert!(matches!(
            ImageBuffer::parse("data:image/png;base64,***"),
            Err(DataUrlError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_debug_omits_payload() {
        let image = ImageBuffer::from_bytes("image/png", &[1u8; 64]);
        let debug = format!("{:?}", image);
        assert!(debug.starts_with("ImageBuffer(image/png"));
        assert!(!debug.contains(image.base64_payload()));
    }
}
