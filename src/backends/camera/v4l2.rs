// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Opens a `/dev/video*` node, negotiates MJPEG (falling back to YUYV) and runs
//! a capture thread that keeps the most recent frame. The live frame reports
//! 0x0 until the first buffer has been dequeued.

use super::types::*;
use super::{LiveStream, MediaDevice};
use crate::constants::capture::{
    DEQUEUE_ERROR_PAUSE_MS, DEQUEUE_TIMEOUT_MS, MAX_DEQUEUE_ERRORS, STREAM_BUFFERS,
};
use std::io;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Formats tried in order of preference
const PREFERRED_FORMATS: [PixelFormat; 2] = [PixelFormat::Mjpeg, PixelFormat::Yuyv];

/// Capture device listed by [`enumerate_devices`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub path: String,
    pub card: String,
    pub driver: String,
}

/// Find V4L2 nodes that support video capture
pub fn enumerate_devices() -> Vec<DeviceSummary> {
    let mut paths: Vec<_> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("video"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let dev = Device::with_path(&path).ok()?;
            let caps = dev.query_caps().ok()?;
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                return None;
            }
            Some(DeviceSummary {
                path: path.to_string_lossy().to_string(),
                card: caps.card,
                driver: caps.driver,
            })
        })
        .collect()
}

/// V4L2 device node
#[derive(Debug, Clone)]
pub struct V4l2Device {
    path: String,
}

impl V4l2Device {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MediaDevice for V4l2Device {
    fn label(&self) -> String {
        self.path.clone()
    }

    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn LiveStream>, DeviceError> {
        let path = self.path.clone();
        let constraints = constraints.clone();

        let stream = tokio::task::spawn_blocking(move || V4l2Stream::open(path, constraints))
            .await
            .map_err(|e| DeviceError::Backend(format!("Open task error: {}", e)))??;

        Ok(Box::new(stream))
    }
}

/// Live V4L2 stream backed by a capture thread
pub struct V4l2Stream {
    info: StreamInfo,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl V4l2Stream {
    fn open(path: String, constraints: StreamConstraints) -> Result<Self, DeviceError> {
        let latest = Arc::new(Mutex::new(None));
        let stop_signal = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = {
            let path = path.clone();
            let latest = Arc::clone(&latest);
            let stop_signal = Arc::clone(&stop_signal);
            thread::Builder::new()
                .name("v4l2-capture".to_string())
                .spawn(move || capture_loop(&path, &constraints, stop_signal, latest, ready_tx))
                .map_err(|e| DeviceError::Backend(format!("Failed to spawn capture thread: {}", e)))?
        };

        match ready_rx.recv() {
            Ok(Ok((format, requested))) => Ok(Self {
                info: StreamInfo {
                    device: path,
                    format,
                    requested,
                },
                latest,
                stop_signal,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(DeviceError::Backend("capture thread exited early".to_string()))
            }
        }
    }
}

impl LiveStream for V4l2Stream {
    fn info(&self) -> StreamInfo {
        self.info.clone()
    }

    fn dimensions(&self) -> FrameDimensions {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(CameraFrame::dimensions)
            .unwrap_or_default()
    }

    fn current_frame(&self) -> Result<CameraFrame, DeviceError> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DeviceError::NoFrame)
    }

    fn stop_all_tracks(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(device = %self.info.device, "Capture thread panicked");
            }
            info!(device = %self.info.device, "V4L2 capture stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

type Ready = mpsc::Sender<Result<(PixelFormat, FrameDimensions), DeviceError>>;

/// Open the device and pick the first supported format
fn configure(
    path: &str,
    constraints: &StreamConstraints,
) -> Result<(Device, PixelFormat, FrameDimensions), DeviceError> {
    let dev = Device::with_path(path).map_err(|e| DeviceError::from_io(&e, path))?;

    for candidate in PREFERRED_FORMATS {
        let requested = Format::new(
            constraints.width,
            constraints.height,
            FourCC::new(&candidate.fourcc()),
        );
        match dev.set_format(&requested) {
            Ok(actual) if actual.fourcc == requested.fourcc => {
                info!(
                    path,
                    width = actual.width,
                    height = actual.height,
                    format = %candidate,
                    "V4L2 format configured"
                );
                return Ok((dev, candidate, FrameDimensions::new(actual.width, actual.height)));
            }
            Ok(actual) => {
                debug!(path, wanted = %candidate, got = ?actual.fourcc, "Driver substituted format");
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(DeviceError::PermissionDenied);
                }
                debug!(path, format = %candidate, error = %e, "Format rejected");
            }
        }
    }

    Err(DeviceError::UnsupportedFormat(format!(
        "{} offers neither MJPG nor YUYV",
        path
    )))
}

/// Capture loop running in a separate thread
fn capture_loop(
    path: &str,
    constraints: &StreamConstraints,
    stop_signal: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    ready: Ready,
) {
    let (dev, format, dims) = match configure(path, constraints) {
        Ok(configured) => configured,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream = match MmapStream::with_buffers(&dev, Type::VideoCapture, STREAM_BUFFERS) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(DeviceError::from_io(&e, path)));
            return;
        }
    };

    stream.set_timeout(Duration::from_millis(DEQUEUE_TIMEOUT_MS));

    if ready.send(Ok((format, dims))).is_err() {
        return;
    }

    info!(path, "V4L2 capture loop started");

    let mut failures = 0;
    while !stop_signal.load(Ordering::SeqCst) {
        let (buf, meta) = match stream.next() {
            Ok(frame) => {
                failures = 0;
                frame
            }
            Err(e) => match on_dequeue_error(e.kind(), &mut failures) {
                DequeueAction::Retry => continue,
                DequeueAction::Pause => {
                    warn!(error = %e, failures, "Failed to dequeue frame");
                    thread::sleep(Duration::from_millis(DEQUEUE_ERROR_PAUSE_MS));
                    continue;
                }
                DequeueAction::GiveUp => {
                    warn!(error = %e, failures, path, "Too many dequeue failures, stopping capture");
                    break;
                }
            },
        };

        let used = (meta.bytesused as usize).min(buf.len());
        if used == 0 {
            continue;
        }

        let frame = CameraFrame::new(dims.width, dims.height, format, buf[..used].to_vec());
        *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    debug!(path, "V4L2 capture loop stopped");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DequeueAction {
    /// Nothing arrived in time; check the stop flag again
    Retry,
    Pause,
    GiveUp,
}

fn on_dequeue_error(kind: io::ErrorKind, failures: &mut u32) -> DequeueAction {
    if kind == io::ErrorKind::TimedOut {
        return DequeueAction::Retry;
    }
    *failures += 1;
    if *failures >= MAX_DEQUEUE_ERRORS {
        DequeueAction::GiveUp
    } else {
        DequeueAction::Pause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_do_not_count_as_failures() {
        let mut failures = 0;
        for _ in 0..(MAX_DEQUEUE_ERRORS * 2) {
            assert_eq!(
                on_dequeue_error(io::ErrorKind::TimedOut, &mut failures),
                DequeueAction::Retry
            );
        }
        assert_eq!(failures, 0);
    }

    #[test]
    fn test_persistent_errors_stop_capture() {
        let mut failures = 0;
        for _ in 1..MAX_DEQUEUE_ERRORS {
            assert_eq!(
                on_dequeue_error(io::ErrorKind::Other, &mut failures),
                DequeueAction::Pause
            );
        }
        assert_eq!(
            on_dequeue_error(io::ErrorKind::Other, &mut failures),
            DequeueAction::GiveUp
        );
    }

    #[test]
    fn test_timeout_between_errors_keeps_count() {
        let mut failures = MAX_DEQUEUE_ERRORS - 2;
        on_dequeue_error(io::ErrorKind::Interrupted, &mut failures);
        on_dequeue_error(io::ErrorKind::TimedOut, &mut failures);
        assert_eq!(failures, MAX_DEQUEUE_ERRORS - 1);
        assert_eq!(
            on_dequeue_error(io::ErrorKind::Interrupted, &mut failures),
            DequeueAction::GiveUp
        );
    }
}
