//! Confirmation gate for lossless downloads

use crate::types::{DownloadDecision, DownloadKey, PendingConfirmation};

/// Holds at most one lossless download awaiting the user's decision
///
/// A second lossless request made before the first is resolved replaces it;
/// there is no queue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfirmationGate {
    pending: Option<PendingConfirmation>,
}

impl ConfirmationGate {
    /// Create an empty gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a download request
    ///
    /// Lossy requests pass straight through without touching the gate.
    pub fn request_download(
        &mut self,
        key: DownloadKey,
        title: impl Into<String>,
        is_lossless: bool,
    ) -> DownloadDecision {
        if !is_lossless {
            return DownloadDecision::ProceedImmediately;
        }

        let next = PendingConfirmation {
            key,
            title: title.into(),
        };
        if let Some(previous) = self.pending.replace(next) {
            tracing::debug!(
                replaced = %previous.key,
                "pending lossless confirmation overwritten"
            );
        }
        DownloadDecision::AwaitingConfirmation
    }

    /// Take the pending request, leaving the gate empty
    pub fn confirm(&mut self) -> Option<PendingConfirmation> {
        self.pending.take()
    }

    /// Drop the pending request, if any
    pub fn cancel(&mut self) -> Option<PendingConfirmation> {
        self.pending.take()
    }

    /// The request currently waiting, if any
    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    /// Whether `key` is the request currently waiting
    pub fn is_pending(&self, key: &DownloadKey) -> bool {
        self.pending.as_ref().is_some_and(|p| &p.key == key)
    }
}
