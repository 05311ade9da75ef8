//! Session state aggregate
//!
//! All per-session client state lives in one [`SessionState`] value. Each
//! user or network event has its own `on_*` transition method, so every
//! transition can be exercised without a transport. In-flight downloads are
//! tracked separately by [`DownloadTracker`](crate::tracker::DownloadTracker)
//! because concurrent tasks update that set on their own.

use crate::confirmation::ConfirmationGate;
use crate::error::{Error, ErrorRecord};
use crate::format_policy;
use crate::types::{
    AudioFormat, Bitrate, DownloadDecision, DownloadKey, FormatSelection, Method,
    PendingConfirmation, ServerFormats, VideoResult,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything the client remembers for the current session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Search box text
    pub query: String,
    /// Results of the last successful search
    pub results: Vec<VideoResult>,
    /// Current output selection
    pub selection: FormatSelection,
    /// Whether the latest search is still outstanding
    pub searching: bool,
    /// Error shown in the error view, if any
    pub error: Option<ErrorRecord>,
    /// Advisory format metadata from the startup formats check
    pub formats: Option<ServerFormats>,
    gate: ConfirmationGate,
    latest_search: u64,
}

impl SessionState {
    /// Fresh session starting from `selection`
    pub fn new(selection: FormatSelection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    /// The lossless download waiting for confirmation, if any
    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.gate.pending()
    }

    /// Whether `key` is waiting for confirmation
    pub fn is_pending(&self, key: &DownloadKey) -> bool {
        self.gate.is_pending(key)
    }

    /// Whether the bitrate control is currently editable
    pub fn bitrate_editable(&self) -> bool {
        format_policy::bitrate_applies(self.selection.format)
    }

    /// The user edited the search box
    pub fn on_query_changed(&mut self, text: &str) {
        self.query = text.to_string();
    }

    /// A search request is about to be sent; returns its generation
    pub fn on_search_started(&mut self) -> u64 {
        self.latest_search += 1;
        self.searching = true;
        self.error = None;
        self.latest_search
    }

    /// Store results of search `generation`
    ///
    /// Returns `false`, changing nothing, if a newer search was started since.
    pub fn on_search_succeeded(&mut self, generation: u64, results: Vec<VideoResult>) -> bool {
        if generation != self.latest_search {
            return false;
        }
        self.searching = false;
        self.results = results;
        true
    }

    /// Record the failure of search `generation`; stored results are kept
    ///
    /// Returns `false`, changing nothing, if a newer search was started since.
    pub fn on_search_failed(&mut self, generation: u64, error: &Error) -> bool {
        if generation != self.latest_search {
            return false;
        }
        self.searching = false;
        self.error = Some(ErrorRecord::from(error));
        true
    }

    /// The user picked an output format
    pub fn on_format_selected(&mut self, format: AudioFormat) {
        self.selection.format = format;
    }

    /// The user picked a bitrate
    ///
    /// Ignored (returns `false`) while a lossless format is selected.
    pub fn on_bitrate_selected(&mut self, bitrate: Bitrate) -> bool {
        if !self.bitrate_editable() {
            tracing::debug!(
                format = %self.selection.format,
                "bitrate is fixed for lossless formats"
            );
            return false;
        }
        self.selection.bitrate = bitrate;
        true
    }

    /// The user picked a processing method
    pub fn on_method_selected(&mut self, method: Method) {
        self.selection.method = method;
    }

    /// The user asked to download a result
    pub fn on_download_requested(&mut self, key: DownloadKey, title: &str) -> DownloadDecision {
        let lossless = format_policy::is_lossless(self.selection.format);
        self.gate.request_download(key, title, lossless)
    }

    /// The user accepted the lossless warning
    pub fn on_confirm(&mut self) -> Option<PendingConfirmation> {
        self.gate.confirm()
    }

    /// The user dismissed the lossless warning
    pub fn on_cancel(&mut self) -> Option<PendingConfirmation> {
        self.gate.cancel()
    }

    /// An operation failed and must be shown to the user
    pub fn on_error(&mut self, record: ErrorRecord) {
        self.error = Some(record);
    }

    /// The startup formats check answered
    pub fn on_formats_loaded(&mut self, formats: ServerFormats) {
        self.formats = Some(formats);
    }

    /// "Retry" in the error view
    pub fn on_retry(&mut self) {
        self.error = None;
    }

    /// "Home" in the error view: back to an empty search
    pub fn on_home(&mut self) {
        self.error = None;
        self.results.clear();
        self.query.clear();
    }
}

/// Shared handle to the session state
///
/// The lock is only held inside [`read`](Session::read) and
/// [`update`](Session::update) and never across an await point.
#[derive(Clone, Debug, Default)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    /// Wrap an initial state
    pub fn new(state: SessionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Read from the current state
    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&*self.state.lock())
    }

    /// Apply a transition
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut *self.state.lock())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }
}
