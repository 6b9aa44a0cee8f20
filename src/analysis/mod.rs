// SPDX-License-Identifier: GPL-3.0-only

//! Image analysis against a multimodal inference endpoint
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌─────────────┐
//! │ ImageBuffer  │──▶│ AnalysisClient │──▶│  Transport  │──▶ POST generateContent
//! └──────────────┘   │ retry/backoff  │   │  (reqwest)  │
//!                    └───────┬────────┘   └─────────────┘
//!                            ▼
//!                     AnalysisResult { classification, description }
//! ```

pub mod client;
pub mod payload;
pub mod transport;

pub use client::AnalysisClient;
pub use payload::AnalysisResult;
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
