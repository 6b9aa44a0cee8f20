// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle controller
//!
//! The controller provides:
//! - Stream acquisition with retry and exponential backoff
//! - Idempotent teardown, also run on drop
//! - Still capture, which always ends the live session

use super::types::*;
use super::{LiveStream, MediaDevice, RenderTarget};
use crate::errors::{AcquisitionError, CameraError};
use crate::media::{FrameEncoder, ImageBuffer, source};
use crate::retry::{RetryError, RetryPolicy, retry_with_backoff};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Sole owner of the device stream
///
/// State machine: `stopped -> starting -> streaming -> stopped`.
pub struct CameraController {
    device: Arc<dyn MediaDevice>,
    stream: Option<Box<dyn LiveStream>>,
    render_target: Option<Box<dyn RenderTarget>>,
    state: CameraState,
    constraints: StreamConstraints,
    policy: RetryPolicy,
    encoder: FrameEncoder,
}

impl CameraController {
    pub fn new(device: Arc<dyn MediaDevice>) -> Self {
        info!(device = %device.label(), "Creating camera controller");

        Self {
            device,
            stream: None,
            render_target: None,
            state: CameraState::Stopped,
            constraints: StreamConstraints::default(),
            policy: RetryPolicy::default(),
            encoder: FrameEncoder::default(),
        }
    }

    /// Attach live streams to this target while streaming
    pub fn with_render_target(mut self, target: Box<dyn RenderTarget>) -> Self {
        self.render_target = Some(target);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_constraints(mut self, constraints: StreamConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_encoder(mut self, encoder: FrameEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == CameraState::Streaming && self.stream.is_some()
    }

    /// Dimensions of the live frame, if a session is open
    pub fn frame_dimensions(&self) -> Option<FrameDimensions> {
        self.stream.as_ref().map(|stream| stream.dimensions())
    }

    /// Open a live stream, retrying with backoff
    ///
    /// An open session is fully stopped first. When every attempt fails the
    /// controller is left `stopped` and the last device error is reported.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<(), CameraError> {
        if self.state != CameraState::Stopped || self.stream.is_some() {
            info!("Restarting camera, stopping current session first");
            self.stop();
        }

        let state = StartingGuard::enter(&mut self.state);
        info!(device = %self.device.label(), "Starting camera");

        let device = Arc::clone(&self.device);
        let constraints = self.constraints.clone();
        let result = retry_with_backoff(&self.policy, cancel, "camera", |_| {
            let device = Arc::clone(&device);
            let constraints = constraints.clone();
            async move { device.request_stream(&constraints).await }
        })
        .await;

        match result {
            Ok(stream) => {
                let info = stream.info();
                if let Some(target) = self.render_target.as_mut() {
                    target.attach(&info);
                }
                self.stream = Some(stream);
                state.settle(CameraState::Streaming);
                info!(device = %info.device, format = %info.format, "Camera streaming");
                Ok(())
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                error!(attempts, error = %last, name = last.name(), "Camera unavailable");
                Err(CameraError::Unavailable {
                    attempts,
                    name: last.name(),
                    source: last,
                })
            }
            Err(RetryError::Cancelled) => {
                info!("Camera start cancelled");
                Err(CameraError::Cancelled)
            }
        }
    }

    /// Release the device and clear the render target
    ///
    /// Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            info!("Camera stopped");
        }
        if let Some(target) = self.render_target.as_mut() {
            target.clear();
        }
        self.state = CameraState::Stopped;
    }

    /// Poll until the live frame has pixels or `timeout` elapses
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        let poll = Duration::from_millis(crate::constants::capture::FIRST_FRAME_POLL_MS);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.frame_dimensions() {
                Some(dims) if dims.is_ready() => return true,
                None => return false,
                Some(_) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Capture the current frame as a still and end the session
    ///
    /// Not streaming or a 0x0 frame is `frame-not-ready`; the session is
    /// left untouched in that case.
    pub async fn snap(&mut self) -> Result<ImageBuffer, CameraError> {
        let stream = self
            .stream
            .as_ref()
            .filter(|_| self.state == CameraState::Streaming)
            .ok_or(CameraError::NotStreaming)?;

        let dims = stream.dimensions();
        if !dims.is_ready() {
            warn!(dimensions = %dims, "Snap requested before the stream produced a frame");
            return Err(AcquisitionError::FrameNotReady {
                width: dims.width,
                height: dims.height,
            }
            .into());
        }

        let frame = stream.current_frame();
        self.stop();
        let frame = frame.map_err(CameraError::Frame)?;

        let encoder = self.encoder;
        tokio::task::spawn_blocking(move || source::from_capture(&frame, &encoder))
            .await
            .map_err(|e| AcquisitionError::Conversion(format!("Encoding task error: {}", e)))?
            .map_err(CameraError::from)
    }
}

/// Holds the controller in `starting`
///
/// Falls back to `stopped` unless settled, including when the `start`
/// future is dropped mid-retry.
struct StartingGuard<'a> {
    state: &'a mut CameraState,
}

impl<'a> StartingGuard<'a> {
    fn enter(state: &'a mut CameraState) -> Self {
        *state = CameraState::Starting;
        Self { state }
    }

    fn settle(self, next: CameraState) {
        *self.state = next;
    }
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        if *self.state == CameraState::Starting {
            *self.state = CameraState::Stopped;
        }
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::LogRenderTarget;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct StubStream {
        dims: FrameDimensions,
        active: Arc<AtomicBool>,
    }

    impl LiveStream for StubStream {
        fn info(&self) -> StreamInfo {
            StreamInfo {
                device: "stub".to_string(),
                format: PixelFormat::Rgba,
                requested: self.dims,
            }
        }

        fn dimensions(&self) -> FrameDimensions {
            self.dims
        }

        fn current_frame(&self) -> Result<CameraFrame, DeviceError> {
            let len = (self.dims.width * self.dims.height * 4) as usize;
            Ok(CameraFrame::new(
                self.dims.width,
                self.dims.height,
                PixelFormat::Rgba,
                vec![128u8; len],
            ))
        }

        fn stop_all_tracks(&mut self) {
            self.active.store(false, Ordering::SeqCst);
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }

    struct StubDevice {
        dims: FrameDimensions,
        opened: Mutex<Vec<Arc<AtomicBool>>>,
        calls: AtomicU32,
    }

    impl StubDevice {
        fn new(width: u32, height: u32) -> Arc<Self> {
            Arc::new(Self {
                dims: FrameDimensions::new(width, height),
                opened: Mutex::new(Vec::new()),
                calls: AtomicU32::new(0),
            })
        }

        fn active_streams(&self) -> usize {
            self.opened
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.load(Ordering::SeqCst))
                .count()
        }
    }

    #[async_trait]
    impl MediaDevice for StubDevice {
        fn label(&self) -> String {
            "stub".to_string()
        }

        async fn request_stream(
            &self,
            _constraints: &StreamConstraints,
        ) -> Result<Box<dyn LiveStream>, DeviceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let active = Arc::new(AtomicBool::new(true));
            self.opened.lock().unwrap().push(active.clone());
            Ok(Box::new(StubStream {
                dims: self.dims,
                active,
            }))
        }
    }

    #[tokio::test]
    async fn test_start_and_snap() {
        let device = StubDevice::new(4, 4);
        let mut camera = CameraController::new(device.clone());

        camera.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(camera.state(), CameraState::Streaming);

        let image = camera.snap().await.unwrap();
        assert_eq!(image.mime(), "image/jpeg");
        assert_eq!(camera.state(), CameraState::Stopped);
        assert_eq!(device.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_restart_releases_previous_stream() {
        let device = StubDevice::new(4, 4);
        let mut camera = CameraController::new(device.clone());
        let cancel = CancellationToken::new();

        camera.start(&cancel).await.unwrap();
        camera.start(&cancel).await.unwrap();

        assert_eq!(device.calls.load(Ordering::SeqCst), 2);
        assert_eq!(device.active_streams(), 1);
    }

    #[tokio::test]
    async fn test_stop_twice_is_stopped() {
        let device = StubDevice::new(4, 4);
        let mut camera =
            CameraController::new(device.clone()).with_render_target(Box::new(LogRenderTarget::default()));

        camera.start(&CancellationToken::new()).await.unwrap();
        camera.stop();
        camera.stop();

        assert_eq!(camera.state(), CameraState::Stopped);
        assert!(camera.frame_dimensions().is_none());
        assert_eq!(device.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_device() {
        let device = StubDevice::new(4, 4);
        {
            let mut camera = CameraController::new(device.clone());
            camera.start(&CancellationToken::new()).await.unwrap();
            assert_eq!(device.active_streams(), 1);
        }
        assert_eq!(device.active_streams(), 0);
    }

    struct HangingDevice;

    #[async_trait]
    impl MediaDevice for HangingDevice {
        fn label(&self) -> String {
            "hanging".to_string()
        }

        async fn request_stream(
            &self,
            _constraints: &StreamConstraints,
        ) -> Result<Box<dyn LiveStream>, DeviceError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_start_returns_to_stopped() {
        let mut camera = CameraController::new(Arc::new(HangingDevice));
        let cancel = CancellationToken::new();

        let outcome = tokio::time::timeout(Duration::from_millis(100), camera.start(&cancel)).await;

        assert!(outcome.is_err());
        assert_eq!(camera.state(), CameraState::Stopped);
        assert!(!camera.is_streaming());
    }

    #[tokio::test]
    async fn test_snap_without_stream() {
        let mut camera = CameraController::new(StubDevice::new(4, 4));
        let err = camera.snap().await.unwrap_err();
        assert!(matches!(err, CameraError::NotStreaming));
        assert_eq!(err.kind().as_str(), "frame-not-ready");
    }
}
