// SPDX-License-Identifier: GPL-3.0-only

//! Wires acquisitions to analysis tasks
//!
//! The session owns the [`AnalysisStateMachine`]. Each successful acquisition
//! spawns one analysis task with its own cancellation token; a newer
//! acquisition cancels the previous token so at most one request is in
//! flight. Snapshots are published on a `watch` channel after every
//! transition.

use super::state::{AnalysisSnapshot, AnalysisStateMachine};
use crate::analysis::{AnalysisClient, AnalysisResult};
use crate::backends::camera::CameraController;
use crate::errors::{AcquisitionError, AnalysisError, CameraError};
use crate::media::{FileUpload, ImageBuffer, source};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

struct SessionState {
    machine: AnalysisStateMachine,
    in_flight: Option<CancellationToken>,
}

struct Shared {
    state: Mutex<SessionState>,
    updates: watch::Sender<AnalysisSnapshot>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, ticket: Uuid, outcome: Result<AnalysisResult, AnalysisError>) {
        let mut state = self.lock();
        let applied = match outcome {
            Ok(result) => state.machine.analysis_succeeded(ticket, result),
            Err(AnalysisError::Cancelled) => {
                debug!(acquisition = %ticket, "Analysis task cancelled");
                false
            }
            Err(e) => {
                warn!(acquisition = %ticket, kind = %e.kind(), error = %e, "Analysis failed");
                state.machine.analysis_failed(ticket, e.to_string())
            }
        };
        if applied {
            state.in_flight = None;
            self.updates.send_replace(state.machine.snapshot());
        }
    }
}

/// Analysis front end observed through snapshots
pub struct AnalysisSession {
    client: Arc<AnalysisClient>,
    shared: Arc<Shared>,
    root: CancellationToken,
}

impl AnalysisSession {
    pub fn new(client: AnalysisClient) -> Self {
        let (updates, _) = watch::channel(AnalysisSnapshot::default());
        Self {
            client: Arc::new(client),
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    machine: AnalysisStateMachine::new(),
                    in_flight: None,
                }),
                updates,
            }),
            root: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.shared.lock().machine.snapshot()
    }

    /// Start analysing a freshly acquired image
    ///
    /// Supersedes any analysis still in flight. Returns the spawned task, or
    /// `None` when the credential is missing. Must be called inside a Tokio
    /// runtime.
    pub fn image_acquired(&self, image: ImageBuffer) -> Option<JoinHandle<()>> {
        let mut state = self.shared.lock();
        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
        }

        let ticket = state.machine.image_acquired(self.client.has_credential());
        self.shared.updates.send_replace(state.machine.snapshot());
        let ticket = ticket?;

        let token = self.root.child_token();
        state.in_flight = Some(token.clone());
        drop(state);

        let client = Arc::clone(&self.client);
        let shared = Arc::clone(&self.shared);
        Some(tokio::spawn(async move {
            let outcome = client.analyze(&image, &token).await;
            shared.finish(ticket, outcome);
        }))
    }

    /// Validate an upload and analyse it
    ///
    /// A rejected upload is not an acquisition and leaves the state alone.
    pub fn submit_file(
        &self,
        upload: &FileUpload,
    ) -> Result<Option<JoinHandle<()>>, AcquisitionError> {
        let image = source::from_file(upload)?;
        Ok(self.image_acquired(image))
    }

    /// Snap a still from the camera and analyse it
    pub async fn snap_and_submit(
        &self,
        camera: &mut CameraController,
    ) -> Result<Option<JoinHandle<()>>, CameraError> {
        let image = camera.snap().await?;
        Ok(self.image_acquired(image))
    }

    /// Wait until the current acquisition has an outcome or is abandoned
    pub async fn settled(&self) -> AnalysisSnapshot {
        let mut updates = self.subscribe();
        match updates.wait_for(|s| s.status.is_settled()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Cancel any analysis in flight
    ///
    /// A pending acquisition goes back to `idle` so waiters settle. The
    /// session stays usable for later acquisitions.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if let Some(token) = state.in_flight.take() {
            token.cancel();
        }
        if state.machine.abandon() {
            self.shared.updates.send_replace(state.machine.snapshot());
        }
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
