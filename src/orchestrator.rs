//! Download orchestration
//!
//! Per download key:
//!
//! ```text
//! Idle -> Confirming -> InFlight -> {Saved | Failed} -> Idle
//!   \________________________/^
//!        (lossy formats)
//! ```
//!
//! `Confirming` only exists for lossless formats. The in-flight mark is an
//! [`InFlightGuard`](crate::tracker::InFlightGuard), so it is released on every
//! exit path before the outcome is published.

use crate::error::{DownloadError, Error, ErrorRecord, Result};
use crate::response_parser::extract_filename;
use crate::save::FileSaver;
use crate::session::Session;
use crate::tracker::DownloadTracker;
use crate::transport::{ApiRequest, Transport};
use crate::types::{
    DownloadDecision, DownloadKey, DownloadState, Event, FormatSelection, PendingConfirmation,
    SavedFile,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Where a download request ended up
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadProgress {
    /// A lossless format is selected; call confirm or cancel
    AwaitingConfirmation,
    /// The file was saved
    Saved(SavedFile),
}

/// Runs downloads from request to saved file (cloneable handle)
#[derive(Clone)]
pub struct DownloadOrchestrator {
    transport: Arc<dyn Transport>,
    saver: Arc<dyn FileSaver>,
    tracker: DownloadTracker,
    session: Session,
    event_tx: broadcast::Sender<Event>,
}

impl DownloadOrchestrator {
    /// Create an orchestrator sharing `session` and `tracker`
    pub fn new(
        transport: Arc<dyn Transport>,
        saver: Arc<dyn FileSaver>,
        tracker: DownloadTracker,
        session: Session,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            transport,
            saver,
            tracker,
            session,
            event_tx,
        }
    }

    /// In-flight bookkeeping shared by all download tasks
    pub fn tracker(&self) -> &DownloadTracker {
        &self.tracker
    }

    /// The user asked to download `key`
    ///
    /// Lossy formats download right away. Lossless formats park the request
    /// in the confirmation gate, replacing any request already parked there.
    pub async fn handle_download(&self, key: DownloadKey, title: &str) -> Result<DownloadProgress> {
        let decision = self
            .session
            .update(|s| s.on_download_requested(key.clone(), title));

        match decision {
            DownloadDecision::ProceedImmediately => self
                .perform_download(key, title.to_string())
                .await
                .map(DownloadProgress::Saved),
            DownloadDecision::AwaitingConfirmation => {
                let format = self.session.read(|s| s.selection.format);
                tracing::info!(key = %key, format = %format, "lossless download needs confirmation");
                self.event_tx
                    .send(Event::ConfirmationRequired {
                        key,
                        title: title.to_string(),
                        format,
                    })
                    .ok();
                Ok(DownloadProgress::AwaitingConfirmation)
            }
        }
    }

    /// Start the pending lossless download
    ///
    /// Returns `Ok(None)` when nothing was pending.
    pub async fn confirm(&self) -> Result<Option<SavedFile>> {
        let Some(pending) = self.session.update(|s| s.on_confirm()) else {
            tracing::debug!("confirm with no pending download");
            return Ok(None);
        };
        self.perform_download(pending.key, pending.title)
            .await
            .map(Some)
    }

    /// Drop the pending lossless download, if any
    pub fn cancel(&self) -> Option<PendingConfirmation> {
        let cancelled = self.session.update(|s| s.on_cancel());
        if let Some(pending) = &cancelled {
            tracing::debug!(key = %pending.key, "lossless download cancelled");
        }
        self.event_tx
            .send(Event::ConfirmationCancelled {
                key: cancelled.as_ref().map(|p| p.key.clone()),
            })
            .ok();
        cancelled
    }

    /// Run [`perform_download`](Self::perform_download) on its own task
    pub fn spawn_download(&self, key: DownloadKey, title: String) -> JoinHandle<Result<SavedFile>> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.perform_download(key, title).await })
    }

    /// Current state of `key`
    pub fn state_of(&self, key: &DownloadKey) -> DownloadState {
        if self.session.read(|s| s.is_pending(key)) {
            DownloadState::Confirming
        } else if self.tracker.is_active(key) {
            DownloadState::InFlight
        } else {
            DownloadState::Idle
        }
    }

    /// Download `key` with the current selection and save it
    ///
    /// Skips the confirmation gate. Failures set the session error; other
    /// keys' in-flight marks are never touched.
    pub async fn perform_download(&self, key: DownloadKey, title: String) -> Result<SavedFile> {
        let selection = self.session.read(|s| s.selection);
        let guard = self.tracker.track(key.clone());

        tracing::info!(
            key = %key,
            format = %selection.format,
            bitrate = %selection.bitrate,
            method = %selection.method,
            "download started"
        );
        self.event_tx
            .send(Event::DownloadStarted {
                key: key.clone(),
                title: title.clone(),
            })
            .ok();

        let outcome = self.fetch_and_save(&key, &title, selection).await;
        drop(guard);

        match outcome {
            Ok(saved) => {
                tracing::info!(
                    key = %key,
                    path = %saved.path.display(),
                    bytes = saved.size_bytes,
                    "download saved"
                );
                self.event_tx
                    .send(Event::DownloadSaved {
                        key,
                        path: saved.path.clone(),
                    })
                    .ok();
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "download failed");
                self.session.update(|s| s.on_error(ErrorRecord::from(&e)));
                self.event_tx
                    .send(Event::DownloadFailed {
                        key,
                        error: e.to_string(),
                    })
                    .ok();
                Err(e)
            }
        }
    }

    async fn fetch_and_save(
        &self,
        key: &DownloadKey,
        title: &str,
        selection: FormatSelection,
    ) -> Result<SavedFile> {
        let request = ApiRequest::Download {
            url: key.to_string(),
            selection,
        };
        let response = self
            .transport
            .send(&request)
            .await
            .map_err(Error::into_download_failure)?;

        if !response.is_success() {
            return Err(DownloadError::Status {
                status: response.status,
            }
            .into());
        }

        let filename = extract_filename(
            response.content_disposition.as_deref(),
            title,
            selection.format,
        );
        let size_bytes = response.body.len() as u64;
        let path = self
            .saver
            .save(&filename, response.body)
            .await
            .map_err(|e| match e {
                Error::Save { .. } => e,
                other => Error::Save {
                    filename: filename.clone(),
                    reason: other.to_string(),
                },
            })?;

        Ok(SavedFile {
            key: key.clone(),
            path,
            size_bytes,
        })
    }
}
