// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba,
    /// 8-bit RGB, 3 bytes per pixel
    Rgb,
    /// YUV 4:2:2 packed as Y0 U0 Y1 V0
    Yuyv,
    /// Motion-JPEG, each frame is a complete JPEG image
    Mjpeg,
}

impl PixelFormat {
    /// V4L2 FourCC code
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            PixelFormat::Rgba => *b"AB24",
            PixelFormat::Rgb => *b"RGB3",
            PixelFormat::Yuyv => *b"YUYV",
            PixelFormat::Mjpeg => *b"MJPG",
        }
    }

    /// Map a V4L2 FourCC code back to a supported format
    pub fn from_fourcc(code: [u8; 4]) -> Option<Self> {
        match &code {
            b"AB24" => Some(PixelFormat::Rgba),
            b"RGB3" => Some(PixelFormat::Rgb),
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"MJPG" => Some(PixelFormat::Mjpeg),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&code))
    }
}

/// Width and height of the live frame
///
/// Zero in either dimension means the stream has not produced a frame yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl std::fmt::Display for FrameDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single frame copied out of the live stream
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    pub captured_at: Instant,
}

impl CameraFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            format,
            captured_at: Instant::now(),
        }
    }

    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions::new(self.width, self.height)
    }
}

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointed at the scene
    #[default]
    Environment,
    /// Front camera, pointed at the user
    User,
}

/// What the controller asks the device for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            width: crate::constants::capture::DEFAULT_WIDTH,
            height: crate::constants::capture::DEFAULT_HEIGHT,
            facing: FacingMode::default(),
        }
    }
}

/// Description of an acquired stream, handed to the render target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub device: String,
    pub format: PixelFormat,
    pub requested: FrameDimensions,
}

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    #[default]
    Stopped,
    Starting,
    Streaming,
}

impl std::fmt::Display for CameraState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraState::Stopped => write!(f, "stopped"),
            CameraState::Starting => write!(f, "starting"),
            CameraState::Streaming => write!(f, "streaming"),
        }
    }
}

/// Errors reported by a media device
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("permission to open the camera was denied")]
    PermissionDenied,
    #[error("no camera at {0}")]
    NotFound(String),
    #[error("camera is busy or unreadable: {0}")]
    Busy(String),
    #[error("no supported format: {0}")]
    UnsupportedFormat(String),
    #[error("no frame available yet")]
    NoFrame,
    #[error("backend failure: {0}")]
    Backend(String),
}

impl DeviceError {
    /// Identifying name surfaced with `camera-unavailable`
    pub fn name(&self) -> &'static str {
        match self {
            DeviceError::PermissionDenied => "PermissionDenied",
            DeviceError::NotFound(_) => "DeviceNotFound",
            DeviceError::Busy(_) => "DeviceBusy",
            DeviceError::UnsupportedFormat(_) => "UnsupportedFormat",
            DeviceError::NoFrame => "NoFrame",
            DeviceError::Backend(_) => "BackendFailure",
        }
    }

    /// Classify an OS error from opening or configuring a device node
    pub fn from_io(err: &std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied,
            std::io::ErrorKind::NotFound => DeviceError::NotFound(path.to_string()),
            _ if err.raw_os_error() == Some(libc::EBUSY) => DeviceError::Busy(err.to_string()),
            _ => DeviceError::Backend(err.to_string()),
        }
    }
}
