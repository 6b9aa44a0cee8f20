// SPDX-License-Identifier: GPL-3.0-only

//! Application core
//!
//! # Architecture
//!
//! - `state`: the analysis state machine and its snapshots
//! - `session`: acquisition events, analysis tasks and snapshot publishing
//!
//! ```text
//!  FileUpload ──▶ source::from_file ─┐
//!                                    ├──▶ AnalysisSession ──▶ watch<AnalysisSnapshot>
//!  CameraController::snap ───────────┘         │
//!                                              └──▶ AnalysisClient (one task per acquisition)
//! ```

pub mod session;
pub mod state;

pub use session::AnalysisSession;
pub use state::{AnalysisSnapshot, AnalysisStateMachine, AnalysisStatus};

use std::path::PathBuf;
use tracing::info;

/// Default directory for saved captures (~/Pictures/insight-camera)
pub fn get_photo_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("insight-camera")
}

/// Ensure the capture directory exists, creating it if necessary
pub fn ensure_directory(dir: PathBuf) -> Result<PathBuf, std::io::Error> {
    std::fs::create_dir_all(&dir)?;
    info!(path = %dir.display(), "Capture directory ready");
    Ok(dir)
}
