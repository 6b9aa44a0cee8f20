// SPDX-License-Identifier: GPL-3.0-only

//! Insight Camera - photo acquisition and AI classification
//!
//! This library acquires a still image (from a live camera or an uploaded
//! file), sends it to a multimodal inference endpoint and tracks the outcome
//! in an explicit state machine.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Analysis state machine and the session driving it
//! - [`analysis`]: Request/response payloads, transport and retrying client
//! - [`backends`]: Camera device abstraction, lifecycle controller, V4L2
//! - [`media`]: Frame encoding and the data-URL image value
//! - [`retry`]: Exponential backoff shared by camera and analysis
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load()?;
//! let session = AnalysisSession::new(AnalysisClient::new(&config)?);
//! let upload = media::source::read_path(Path::new("cat.png")).await?;
//! if let Some(task) = session.submit_file(&upload)? {
//!     task.await?;
//! }
//! println!("{:?}", session.snapshot());
//! ```

pub mod analysis;
pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod retry;

// Re-export commonly used types
pub use analysis::{AnalysisClient, AnalysisResult};
pub use app::{AnalysisSession, AnalysisSnapshot, AnalysisStateMachine, AnalysisStatus};
pub use backends::camera::CameraController;
pub use config::Config;
pub use errors::{AppError, AppResult, ErrorKind};
pub use media::{FileUpload, ImageBuffer};
