// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing V4L2 capture devices
//! - Analysing an image file
//! - Snapping a still from the camera and analysing it
//! - Showing the resolved configuration

use chrono::Local;
use insight_camera::analysis::AnalysisClient;
use insight_camera::app::{self, AnalysisSession, AnalysisSnapshot, AnalysisStatus};
use insight_camera::backends::camera::v4l2::{V4l2Device, enumerate_devices};
use insight_camera::backends::camera::{CameraController, LogRenderTarget};
use insight_camera::config::Config;
use insight_camera::constants::capture::FIRST_FRAME_TIMEOUT_SECS;
use insight_camera::media::{ImageBuffer, source};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// List all V4L2 capture devices
pub fn list_cameras() -> CliResult<()> {
    let devices = enumerate_devices();

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device.card);
        println!("      Path: {}", device.path);
        println!("      Driver: {}", device.driver);
        println!();
    }

    Ok(())
}

/// Print the resolved configuration with the credential redacted
pub fn show_config() -> CliResult<()> {
    let config = Config::load()?;

    match Config::default_path() {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} (not present, using defaults)", path.display()),
        None => println!("Config file: <no config directory>"),
    }
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    if config.credential().is_none() {
        println!();
        println!("No credential configured; analysis will report credential-missing.");
    }

    Ok(())
}

/// Analyse an image file from disk
pub fn analyze_file(path: PathBuf, json: bool) -> CliResult<()> {
    let config = Config::load()?;
    let session = AnalysisSession::new(AnalysisClient::new(&config)?);

    let rt = tokio::runtime::Runtime::new()?;
    let snapshot = rt.block_on(async {
        let upload = source::read_path(&path).await?;
        if let Some(task) = session.submit_file(&upload)? {
            task.await?;
        }
        Ok::<_, Box<dyn Error>>(session.snapshot())
    })?;

    print_snapshot(&snapshot, json)
}

/// Snap a still from the camera, optionally save it, and analyse it
pub fn snap(device: Option<String>, save: Option<PathBuf>, json: bool) -> CliResult<()> {
    let config = Config::load()?;
    let device = device.unwrap_or_else(|| config.camera_device.clone());
    let session = AnalysisSession::new(AnalysisClient::new(&config)?);

    let mut camera = CameraController::new(Arc::new(V4l2Device::new(device.clone())))
        .with_render_target(Box::new(LogRenderTarget::default()))
        .with_constraints(config.stream_constraints())
        .with_retry_policy(config.retry_policy())
        .with_encoder(config.encoder());

    println!("Using camera: {}", device);

    let rt = tokio::runtime::Runtime::new()?;
    let snapshot = rt.block_on(async {
        camera.start(&CancellationToken::new()).await?;

        let timeout = Duration::from_secs(FIRST_FRAME_TIMEOUT_SECS);
        if !camera.wait_until_ready(timeout).await {
            camera.stop();
            return Err(format!("No frame from {} within {}s", device, timeout.as_secs()).into());
        }

        println!("Capturing...");
        let image = camera.snap().await?;

        if let Some(dir) = save {
            let path = save_capture(&image, dir)?;
            println!("Photo saved: {}", path.display());
        }

        if let Some(task) = session.image_acquired(image) {
            task.await?;
        }
        Ok::<_, Box<dyn Error>>(session.snapshot())
    })?;

    print_snapshot(&snapshot, json)
}

/// Write the capture as `IMG_<timestamp>.jpg` into `dir`
fn save_capture(image: &ImageBuffer, dir: PathBuf) -> CliResult<PathBuf> {
    let dir = app::ensure_directory(dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("IMG_{}.{}", timestamp, extension_for(image.mime())));
    std::fs::write(&path, image.decode()?)?;
    Ok(path)
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Render a settled snapshot; failures become the command's error
fn print_snapshot(snapshot: &AnalysisSnapshot, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    }

    match (snapshot.status, &snapshot.result) {
        (AnalysisStatus::Complete, Some(result)) => {
            if !json {
                println!("Classification: {}", result.classification);
                for line in result.description_lines() {
                    println!("  {}", line);
                }
            }
            Ok(())
        }
        (status, _) => Err(format!(
            "{}: {}",
            status,
            snapshot.error.as_deref().unwrap_or("no result")
        )
        .into()),
    }
}

/// Used by the default `--save` directory
pub fn default_save_dir() -> PathBuf {
    app::get_photo_directory()
}
