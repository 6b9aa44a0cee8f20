// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture and analysis core
//!
//! Every error maps onto an [`ErrorKind`], the stable tag observers see next
//! to the human-readable message.

use crate::backends::camera::DeviceError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Stable failure tags surfaced to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CredentialMissing,
    InvalidFileType,
    FrameNotReady,
    EncodingFailure,
    CameraUnavailable,
    TransportFailure,
    MalformedResponse,
    Cancelled,
    Config,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CredentialMissing => "credential-missing",
            ErrorKind::InvalidFileType => "invalid-file-type",
            ErrorKind::FrameNotReady => "frame-not-ready",
            ErrorKind::EncodingFailure => "encoding-failure",
            ErrorKind::CameraUnavailable => "camera-unavailable",
            ErrorKind::TransportFailure => "transport-failure",
            ErrorKind::MalformedResponse => "malformed-response",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main application error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Camera(e) => e.kind(),
            AppError::Acquisition(e) => e.kind(),
            AppError::Analysis(e) => e.kind(),
            AppError::Config(_) => ErrorKind::Config,
            AppError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Input validation failures while acquiring a still image
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquisitionError {
    /// Declared type of an uploaded file is not an image type
    #[error("Unsupported file type '{declared}', expected an image")]
    InvalidFileType { declared: String },
    /// Uploaded file has no content
    #[error("File is empty")]
    EmptyFile,
    /// The live frame has no pixels yet
    #[error("Stream not ready: frame is {width}x{height}")]
    FrameNotReady { width: u32, height: u32 },
    /// Frame bytes do not match the advertised dimensions or format
    #[error("Frame conversion failed: {0}")]
    Conversion(String),
    /// Reading the source file failed
    #[error("Failed to read image: {0}")]
    Read(String),
}

impl AcquisitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AcquisitionError::InvalidFileType { .. } | AcquisitionError::EmptyFile => {
                ErrorKind::InvalidFileType
            }
            AcquisitionError::FrameNotReady { .. } => ErrorKind::FrameNotReady,
            AcquisitionError::Conversion(_) => ErrorKind::EncodingFailure,
            AcquisitionError::Read(_) => ErrorKind::Storage,
        }
    }
}

/// Camera lifecycle errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum CameraError {
    /// Device acquisition failed on every attempt
    #[error("Camera unavailable after {attempts} attempts: {name} ({source})")]
    Unavailable {
        attempts: u32,
        name: &'static str,
        source: DeviceError,
    },
    /// Snap requested without a live session
    #[error("Stream not ready: camera is not streaming")]
    NotStreaming,
    /// Start abandoned by its cancellation token
    #[error("Camera start cancelled")]
    Cancelled,
    #[error(transparent)]
    Capture(#[from] AcquisitionError),
    /// Reading the live frame failed
    #[error("Failed to read frame: {0}")]
    Frame(DeviceError),
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::Unavailable { .. } => ErrorKind::CameraUnavailable,
            CameraError::NotStreaming | CameraError::Frame(_) => ErrorKind::FrameNotReady,
            CameraError::Cancelled => ErrorKind::Cancelled,
            CameraError::Capture(e) => e.kind(),
        }
    }
}

/// Failure of a single request to the inference endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error("network error: {0}")]
    Network(String),
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl AttemptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttemptError::Network(_) | AttemptError::Status { .. } => ErrorKind::TransportFailure,
            AttemptError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }
}

/// Terminal outcome of an analysis call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("API credential is not configured")]
    CredentialMissing,
    #[error("Analysis failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: AttemptError },
    #[error("Analysis superseded or cancelled")]
    Cancelled,
    /// The HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::CredentialMissing => ErrorKind::CredentialMissing,
            AnalysisError::Exhausted { last, .. } => last.kind(),
            AnalysisError::Cancelled => ErrorKind::Cancelled,
            AnalysisError::Setup(_) => ErrorKind::Config,
        }
    }
}
