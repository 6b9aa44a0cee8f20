// SPDX-License-Identifier: GPL-3.0-only

//! Analysis state machine
//!
//! ```text
//!            imageAcquired (credential)        success
//!   idle ─────────────────────────────▶ loading ───────▶ complete
//!     │                                  │  ▲
//!     │ imageAcquired (no credential)    │  └── imageAcquired from any state
//!     ▼                                  ▼
//!   credential-missing                 failed
//! ```
//!
//! Every acquisition gets a fresh id. Outcomes carry the id of the acquisition
//! they belong to and are dropped unless it is still the one loading.

use crate::analysis::AnalysisResult;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Message shown when no credential is configured
pub const CREDENTIAL_MISSING_MESSAGE: &str =
    "API credential is not configured. Set INSIGHT_CAMERA_API_KEY to enable analysis.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Loading,
    Complete,
    Failed,
    CredentialMissing,
}

impl AnalysisStatus {
    /// No further transition without a new acquisition
    pub fn is_settled(&self) -> bool {
        !matches!(self, AnalysisStatus::Loading)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStatus::Idle => "idle",
            AnalysisStatus::Loading => "loading",
            AnalysisStatus::Complete => "complete",
            AnalysisStatus::Failed => "failed",
            AnalysisStatus::CredentialMissing => "credential-missing",
        };
        f.write_str(name)
    }
}

/// Observer-facing copy of the state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSnapshot {
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Acquisition this state belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition: Option<Uuid>,
}

#[derive(Debug, Default)]
pub struct AnalysisStateMachine {
    state: AnalysisSnapshot,
}

impl AnalysisStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AnalysisStatus {
        self.state.status
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.state.clone()
    }

    /// Id of the acquisition currently loading
    pub fn pending(&self) -> Option<Uuid> {
        match self.state.status {
            AnalysisStatus::Loading => self.state.acquisition,
            _ => None,
        }
    }

    /// A new image replaces whatever came before
    ///
    /// Returns the ticket to report the outcome with, or `None` when the
    /// credential is missing and no analysis should start.
    pub fn image_acquired(&mut self, credential_present: bool) -> Option<Uuid> {
        let id = Uuid::new_v4();
        let previous = self.state.status;

        self.state = if credential_present {
            AnalysisSnapshot {
                status: AnalysisStatus::Loading,
                result: None,
                error: None,
                acquisition: Some(id),
            }
        } else {
            AnalysisSnapshot {
                status: AnalysisStatus::CredentialMissing,
                result: None,
                error: Some(CREDENTIAL_MISSING_MESSAGE.to_string()),
                acquisition: Some(id),
            }
        };

        info!(
            acquisition = %id,
            from = %previous,
            to = %self.state.status,
            "Image acquired"
        );
        credential_present.then_some(id)
    }

    /// Returns `false` when the ticket is stale
    pub fn analysis_succeeded(&mut self, ticket: Uuid, result: AnalysisResult) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.state.status = AnalysisStatus::Complete;
        self.state.result = Some(result);
        self.state.error = None;
        info!(acquisition = %ticket, "Analysis complete");
        true
    }

    /// Returns `false` when the ticket is stale
    pub fn analysis_failed(&mut self, ticket: Uuid, message: impl Into<String>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        let message = message.into();
        info!(acquisition = %ticket, error = %message, "Analysis failed");
        self.state.status = AnalysisStatus::Failed;
        self.state.result = None;
        self.state.error = Some(message);
        true
    }

    /// Drop a pending analysis without an outcome, back to `idle`
    ///
    /// Returns `false` when nothing was loading.
    pub fn abandon(&mut self) -> bool {
        let Some(ticket) = self.pending() else {
            return false;
        };
        self.state = AnalysisSnapshot::default();
        info!(acquisition = %ticket, "Analysis abandoned");
        true
    }

    fn accepts(&self, ticket: Uuid) -> bool {
        let current = self.pending() == Some(ticket);
        if !current {
            debug!(acquisition = %ticket, "Ignoring outcome of superseded acquisition");
        }
        current
    }
}
