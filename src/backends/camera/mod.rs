// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  AnalysisSession    │
//! └──────────┬──────────┘
//!            │ snap
//!            ▼
//! ┌─────────────────────┐
//! │  CameraController   │  ← Lifecycle, retry, teardown
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ MediaDevice / Live- │  ← Opaque device capability
//! │ Stream / RenderTgt  │
//! └──────────┬──────────┘
//!            │
//!            ▼
//!        ┌──────┐
//!        │ V4L2 │  ← Concrete implementation
//!        └──────┘
//! ```
//!
//! The controller is the only owner of a [`LiveStream`]; nothing else reads
//! from or stops the device.

pub mod controller;
pub mod format_converters;
pub mod types;
pub mod v4l2;

pub use controller::CameraController;
pub use types::*;

use async_trait::async_trait;

/// Source of live video streams
#[async_trait]
pub trait MediaDevice: Send + Sync {
    /// Human-readable device label (path or card name)
    fn label(&self) -> String;

    /// Acquire a live stream matching `constraints`
    ///
    /// Each call opens a fresh stream; the caller owns it until
    /// [`LiveStream::stop_all_tracks`] is called or it is dropped.
    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn LiveStream>, DeviceError>;
}

/// An open device stream
pub trait LiveStream: Send {
    /// Description of what was negotiated with the device
    fn info(&self) -> StreamInfo;

    /// Dimensions of the latest frame, zero until the first frame arrives
    fn dimensions(&self) -> FrameDimensions;

    /// Copy of the latest frame
    fn current_frame(&self) -> Result<CameraFrame, DeviceError>;

    /// Stop every track and release the device
    ///
    /// Calling this more than once is harmless.
    fn stop_all_tracks(&mut self);

    /// Whether any track is still running
    fn is_active(&self) -> bool;
}

/// Where a live stream is shown while streaming
pub trait RenderTarget: Send {
    fn attach(&mut self, info: &StreamInfo);

    fn clear(&mut self);
}

/// Render target that only records lifecycle in the log
#[derive(Debug, Default)]
pub struct LogRenderTarget {
    attached: Option<StreamInfo>,
}

impl LogRenderTarget {
    pub fn attached(&self) -> Option<&StreamInfo> {
        self.attached.as_ref()
    }
}

impl RenderTarget for LogRenderTarget {
    fn attach(&mut self, info: &StreamInfo) {
        tracing::info!(device = %info.device, format = %info.format, "Preview attached");
        self.attached = Some(info.clone());
    }

    fn clear(&mut self) {
        if self.attached.take().is_some() {
            tracing::info!("Preview cleared");
        }
    }
}
