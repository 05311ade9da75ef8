//! The [`Client`] facade

use crate::config::Config;
use crate::error::{Error, ErrorRecord, ParseError, Result};
use crate::orchestrator::{DownloadOrchestrator, DownloadProgress};
use crate::save::{DirectorySaver, FileSaver};
use crate::search::{SearchController, SearchOutcome};
use crate::session::{Session, SessionState};
use crate::tracker::{DownloadTracker, InFlightSet};
use crate::transport::{ApiRequest, HttpTransport, Transport};
use crate::types::{
    AudioFormat, Bitrate, DownloadKey, DownloadState, Event, FormatSelection, Method,
    PendingConfirmation, SavedFile, ServerFormats, VideoResult,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Client for the conversion service (cloneable - all fields are Arc-wrapped)
///
/// Owns one session: the search text and results, the format selection,
/// the pending lossless confirmation, the in-flight downloads and the
/// current error. Clones share the same session.
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    session: Session,
    transport: Arc<dyn Transport>,
    search: SearchController,
    orchestrator: DownloadOrchestrator,
    event_tx: broadcast::Sender<Event>,
}

impl Client {
    /// Create a client talking HTTP to `config.server` and saving into
    /// `config.output.download_dir`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config.server)?);
        let saver = Arc::new(DirectorySaver::new(
            config.output.download_dir.clone(),
            config.output.file_collision,
        ));
        Ok(Self::with_parts(config, transport, saver))
    }

    /// Create a client from explicit transport and saver implementations
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        saver: Arc<dyn FileSaver>,
    ) -> Self {
        // buffer of 1000 events; slow subscribers see Lagged
        let (event_tx, _rx) = broadcast::channel(1000);
        let session = Session::new(SessionState::new(config.defaults));
        let tracker = DownloadTracker::new();

        let search = SearchController::new(transport.clone(), session.clone(), event_tx.clone());
        let orchestrator = DownloadOrchestrator::new(
            transport.clone(),
            saver,
            tracker,
            session.clone(),
            event_tx.clone(),
        );

        Self {
            config: Arc::new(config),
            session,
            transport,
            search,
            orchestrator,
            event_tx,
        }
    }

    /// Subscribe to client events
    ///
    /// Multiple subscribers are supported; each receives every event sent
    /// after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch `GET /formats` and keep the advisory metadata
    ///
    /// Any failure sets the connectivity error. The metadata is display-only;
    /// downloads work without it.
    pub async fn load_formats(&self) -> Result<ServerFormats> {
        match self.fetch_formats().await {
            Ok(formats) => {
                tracing::debug!(methods = formats.methods.len(), "server formats loaded");
                self.session
                    .update(|s| s.on_formats_loaded(formats.clone()));
                Ok(formats)
            }
            Err(e) => {
                tracing::warn!(error = %e, "formats check failed");
                self.session.update(|s| s.on_error(ErrorRecord::connectivity()));
                Err(e)
            }
        }
    }

    async fn fetch_formats(&self) -> Result<ServerFormats> {
        let response = self.transport.send(&ApiRequest::Formats).await?;
        if !response.is_success() {
            return Err(Error::Http {
                status: response.status,
            });
        }
        let formats = serde_json::from_slice(&response.body).map_err(ParseError::from)?;
        Ok(formats)
    }

    /// Set the search text and search for it
    pub async fn search(&self, text: &str) -> Result<SearchOutcome> {
        self.session.update(|s| s.on_query_changed(text));
        self.search.search(text).await
    }

    /// Whether the latest search is still outstanding
    pub fn is_searching(&self) -> bool {
        self.search.is_searching()
    }

    /// Select the output format
    pub fn select_format(&self, format: AudioFormat) {
        self.session.update(|s| s.on_format_selected(format));
    }

    /// Select the bitrate; ignored (returns `false`) for lossless formats
    pub fn select_bitrate(&self, bitrate: Bitrate) -> bool {
        self.session.update(|s| s.on_bitrate_selected(bitrate))
    }

    /// Select the processing method
    pub fn select_method(&self, method: Method) {
        self.session.update(|s| s.on_method_selected(method));
    }

    /// Whether the bitrate can currently be changed
    pub fn bitrate_editable(&self) -> bool {
        self.session.read(|s| s.bitrate_editable())
    }

    /// Request a download of `key`, through the lossless confirmation gate
    pub async fn request_download(
        &self,
        key: impl Into<DownloadKey>,
        title: &str,
    ) -> Result<DownloadProgress> {
        self.orchestrator.handle_download(key.into(), title).await
    }

    /// Request a download of a search result
    pub async fn download_result(&self, result: &VideoResult) -> Result<DownloadProgress> {
        self.orchestrator
            .handle_download(result.key(), &result.title)
            .await
    }

    /// Accept the pending lossless download; `Ok(None)` if nothing was pending
    pub async fn confirm_download(&self) -> Result<Option<SavedFile>> {
        self.orchestrator.confirm().await
    }

    /// Dismiss the pending lossless download
    pub fn cancel_download(&self) -> Option<PendingConfirmation> {
        self.orchestrator.cancel()
    }

    /// Download `key` on a background task, skipping the confirmation gate
    ///
    /// Spawning the same key again while a task for it runs starts a second
    /// request. The key stays in flight until the last of those tasks ends.
    pub fn spawn_download(
        &self,
        key: impl Into<DownloadKey>,
        title: impl Into<String>,
    ) -> JoinHandle<Result<SavedFile>> {
        self.orchestrator.spawn_download(key.into(), title.into())
    }

    /// "Retry" in the error view: clear the error and check the service again
    pub async fn retry(&self) -> Result<ServerFormats> {
        self.session.update(|s| s.on_retry());
        self.event_tx.send(Event::ErrorCleared).ok();
        self.load_formats().await
    }

    /// "Home" in the error view: clear the error, the results and the search text
    pub fn home(&self) {
        self.session.update(|s| s.on_home());
        self.event_tx.send(Event::ErrorCleared).ok();
    }

    /// Copy of the whole session state
    pub fn snapshot(&self) -> SessionState {
        self.session.snapshot()
    }

    /// Current error, if any
    pub fn error(&self) -> Option<ErrorRecord> {
        self.session.read(|s| s.error.clone())
    }

    /// Results of the last successful search
    pub fn results(&self) -> Vec<VideoResult> {
        self.session.read(|s| s.results.clone())
    }

    /// Current format selection
    pub fn selection(&self) -> FormatSelection {
        self.session.read(|s| s.selection)
    }

    /// Keys with a download task running
    pub fn in_flight(&self) -> InFlightSet {
        self.orchestrator.tracker().snapshot()
    }

    /// State of the download for `key`
    pub fn download_state(&self, key: &DownloadKey) -> DownloadState {
        self.orchestrator.state_of(key)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        MemorySaver, ScriptedTransport, audio_response, json_response, status_response,
    };

    const FORMATS: &str = r#"{
        "formats": {
            "fast": {"formats": ["mp3", "aac"], "description": "Quick", "recommended_for": "previews"},
            "quality": {"formats": ["flac", "wav"], "description": "Best", "recommended_for": "archival"}
        },
        "bitrates": ["128", "192", "256", "320"],
        "methods": ["auto", "fast", "quality", "stream"]
    }"#;

    fn client_with(transport: Arc<ScriptedTransport>) -> (Client, Arc<MemorySaver>) {
        let saver = Arc::new(MemorySaver::new());
        let client = Client::with_parts(Config::default(), transport, saver.clone());
        (client, saver)
    }

    #[tokio::test]
    async fn load_formats_stores_metadata() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(json_response(200, FORMATS)));
        let (client, _) = client_with(transport);

        let formats = client.load_formats().await.unwrap();

        assert_eq!(formats.formats["quality"].formats, vec!["flac", "wav"]);
        assert_eq!(formats.methods.len(), 4);
        assert_eq!(client.snapshot().formats, Some(formats));
        assert_eq!(client.error(), None);
    }

    #[tokio::test]
    async fn failed_formats_check_sets_connectivity_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(status_response(502)));
        let (client, _) = client_with(transport);

        let err = client.load_formats().await.unwrap_err();

        assert!(matches!(err, Error::Http { status: 502 }));
        assert_eq!(client.error(), Some(ErrorRecord::connectivity()));
    }

    #[tokio::test]
    async fn garbage_formats_body_sets_connectivity_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(json_response(200, "<html>")));
        let (client, _) = client_with(transport);

        let err = client.load_formats().await.unwrap_err();

        assert_eq!(err.error_code(), "malformed_response");
        assert_eq!(client.error(), Some(ErrorRecord::connectivity()));
    }

    #[tokio::test]
    async fn retry_clears_error_and_checks_again() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Err(Error::Transport {
            cause: "offline".into(),
        }));
        transport.push(Ok(json_response(200, FORMATS)));
        let (client, _) = client_with(transport.clone());
        let mut events = client.subscribe();

        client.load_formats().await.unwrap_err();
        assert!(client.error().is_some());

        client.retry().await.unwrap();

        assert_eq!(client.error(), None);
        assert_eq!(transport.requests(), vec![ApiRequest::Formats; 2]);
        assert!(matches!(events.recv().await.unwrap(), Event::ErrorCleared));
    }

    #[tokio::test]
    async fn home_resets_search_state() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(json_response(200, r#"[{"url":"u1","title":"One"}]"#)));
        transport.push(Ok(status_response(500)));
        let (client, _) = client_with(transport);

        client.search("lofi").await.unwrap();
        client.search("lofi again").await.unwrap_err();
        assert_eq!(client.results().len(), 1);
        assert!(client.error().is_some());

        client.home();

        let state = client.snapshot();
        assert!(state.query.is_empty());
        assert!(state.results.is_empty());
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn search_records_query_text() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(json_response(200, r#"[{"url":"u1","title":"One"}]"#)));
        let (client, _) = client_with(transport);

        client.search(" lofi ").await.unwrap();

        assert_eq!(client.snapshot().query, " lofi ");
        assert!(!client.is_searching());
    }

    #[test]
    fn bitrate_follows_format() {
        let (client, _) = client_with(Arc::new(ScriptedTransport::new()));

        assert!(client.select_bitrate(Bitrate::Kbps256));
        client.select_format(AudioFormat::Alac);
        assert!(!client.bitrate_editable());
        assert!(!client.select_bitrate(Bitrate::Kbps128));
        client.select_method(Method::Quality);

        assert_eq!(
            client.selection(),
            FormatSelection {
                format: AudioFormat::Alac,
                bitrate: Bitrate::Kbps256,
                method: Method::Quality,
            }
        );
    }

    #[test]
    fn new_client_starts_from_configured_defaults() {
        let mut config = Config::default();
        config.defaults.format = AudioFormat::Ogg;
        let client = Client::with_parts(
            config,
            Arc::new(ScriptedTransport::new()),
            Arc::new(MemorySaver::new()),
        );

        assert_eq!(client.selection().format, AudioFormat::Ogg);
        assert!(client.in_flight().is_empty());
    }

    #[tokio::test]
    async fn download_result_uses_title_for_fallback_name() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(json_response(
            200,
            r#"[{"url":"https://youtu.be/v1","title":"My Song"}]"#,
        )));
        transport.push(Ok(audio_response(b"RIFF", None)));
        let (client, saver) = client_with(transport);
        client.select_format(AudioFormat::Ogg);

        client.search("my song").await.unwrap();
        let result = client.results().remove(0);
        let progress = client.download_result(&result).await.unwrap();

        assert!(matches!(progress, DownloadProgress::Saved(_)));
        assert_eq!(saver.filenames(), vec!["My Song.ogg"]);
        assert_eq!(client.download_state(&result.key()), DownloadState::Idle);
    }

    #[tokio::test]
    async fn confirm_and_cancel_go_through_the_gate() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(audio_response(b"fLaC", None)));
        let (client, saver) = client_with(transport);
        client.select_format(AudioFormat::Flac);

        let progress = client.request_download("v1", "Track").await.unwrap();
        assert_eq!(progress, DownloadProgress::AwaitingConfirmation);
        assert_eq!(
            client.download_state(&"v1".into()),
            DownloadState::Confirming
        );
        assert!(client.cancel_download().is_some());
        assert_eq!(client.download_state(&"v1".into()), DownloadState::Idle);

        let _ = client.request_download("v1", "Track").await.unwrap();
        let saved = client.confirm_download().await.unwrap().unwrap();

        assert_eq!(saved.path, std::path::PathBuf::from("/memory/Track.flac"));
        assert_eq!(saver.filenames(), vec!["Track.flac"]);
    }
}
