//! Core types for v2a-dl

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Error;

/// Output audio container/codec requested from the conversion service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III
    #[default]
    Mp3,
    /// Advanced Audio Coding
    Aac,
    /// Apple Lossless
    Alac,
    /// Free Lossless Audio Codec
    Flac,
    /// Uncompressed PCM in a RIFF container
    Wav,
    /// Ogg Vorbis
    Ogg,
}

impl AudioFormat {
    /// Every format the service accepts, in display order
    pub const ALL: [AudioFormat; 6] = [
        AudioFormat::Mp3,
        AudioFormat::Aac,
        AudioFormat::Alac,
        AudioFormat::Flac,
        AudioFormat::Wav,
        AudioFormat::Ogg,
    ];

    /// Wire identifier (also used as the file extension)
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "aac",
            AudioFormat::Alac => "alac",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// Whether this format preserves full source fidelity
    pub fn is_lossless(&self) -> bool {
        crate::format_policy::is_lossless(*self)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AudioFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "unknown audio format '{s}' (expected one of: mp3, aac, alac, flac, wav, ogg)"
                ),
                key: Some("format".to_string()),
            })
    }
}

/// Target bitrate in kbit/s (ignored by the service for lossless formats)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Bitrate {
    /// 128 kbit/s
    Kbps128,
    /// 192 kbit/s
    Kbps192,
    /// 256 kbit/s
    Kbps256,
    /// 320 kbit/s
    #[default]
    Kbps320,
}

impl Bitrate {
    /// Every bitrate the service accepts
    pub const ALL: [Bitrate; 4] = [
        Bitrate::Kbps128,
        Bitrate::Kbps192,
        Bitrate::Kbps256,
        Bitrate::Kbps320,
    ];

    /// Bitrate in kbit/s
    pub fn kbps(&self) -> u32 {
        match self {
            Bitrate::Kbps128 => 128,
            Bitrate::Kbps192 => 192,
            Bitrate::Kbps256 => 256,
            Bitrate::Kbps320 => 320,
        }
    }
}

impl TryFrom<u32> for Bitrate {
    type Error = Error;

    fn try_from(kbps: u32) -> Result<Self, Self::Error> {
        Bitrate::ALL
            .into_iter()
            .find(|b| b.kbps() == kbps)
            .ok_or_else(|| Error::Config {
                message: format!("unsupported bitrate {kbps} (expected 128, 192, 256 or 320)"),
                key: Some("bitrate".to_string()),
            })
    }
}

impl From<Bitrate> for u32 {
    fn from(bitrate: Bitrate) -> Self {
        bitrate.kbps()
    }
}

impl std::fmt::Display for Bitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kbps())
    }
}

impl std::str::FromStr for Bitrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches(['k', 'K']);
        let kbps: u32 = trimmed.parse().map_err(|_| Error::Config {
            message: format!("invalid bitrate '{s}'"),
            key: Some("bitrate".to_string()),
        })?;
        Bitrate::try_from(kbps)
    }
}

/// Processing method the service should use for conversion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Let the service choose based on format
    #[default]
    Auto,
    /// Quick processing
    Fast,
    /// Highest quality processing
    Quality,
    /// Stream the converted audio as it is produced
    Stream,
}

impl Method {
    /// Every method the service accepts
    pub const ALL: [Method; 4] = [Method::Auto, Method::Fast, Method::Quality, Method::Stream];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Auto => "auto",
            Method::Fast => "fast",
            Method::Quality => "quality",
            Method::Stream => "stream",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "unknown method '{s}' (expected one of: auto, fast, quality, stream)"
                ),
                key: Some("method".to_string()),
            })
    }
}

/// The user's current output choice, sent with every download request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSelection {
    /// Output format
    #[serde(default)]
    pub format: AudioFormat,
    /// Bitrate (only meaningful for lossy formats)
    #[serde(default)]
    pub bitrate: Bitrate,
    /// Processing method
    #[serde(default)]
    pub method: Method,
}

/// Identifier of a search result, used to track its download
///
/// This is the result's `url` field.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadKey(pub String);

impl DownloadKey {
    /// Create a new DownloadKey
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DownloadKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for DownloadKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl AsRef<str> for DownloadKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DownloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted search text: trimmed and never empty
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Returns `None` when the text is empty after trimming
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// The trimmed query text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single result from `GET /search`
///
/// Fields are decoded leniently: the service reports whatever the upstream
/// extractor returned, so missing, null or oddly typed fields become empty
/// values instead of failing the whole result list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResult {
    /// Source page URL, doubles as the download key
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: String,
    /// Video title
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    /// Thumbnail URI
    #[serde(default, deserialize_with = "lenient_text")]
    pub thumbnail: String,
    /// Duration in whole seconds, if known
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub duration: Option<u64>,
}

impl VideoResult {
    /// The key used to track this result's download
    pub fn key(&self) -> DownloadKey {
        DownloadKey::new(self.url.clone())
    }

    /// Duration rendered as `m:ss`, or an empty string when unknown
    pub fn duration_label(&self) -> String {
        match self.duration {
            None | Some(0) => String::new(),
            Some(secs) => format!("{}:{:02}", secs / 60, secs % 60),
        }
    }
}

// Strings pass through and numbers or booleans are rendered as text; any
// other JSON type becomes the empty string.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

// The service forwards extractor output verbatim: integer, float, numeric
// string or null. Anything else, or a negative value, is unknown.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_seconds)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().and_then(whole_seconds),
        _ => None,
    };
    Ok(seconds)
}

fn whole_seconds(secs: f64) -> Option<u64> {
    (secs.is_finite() && secs >= 0.0).then_some(secs as u64)
}

/// The lossless download waiting for the user's go-ahead
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Key of the requested result
    pub key: DownloadKey,
    /// Title used as the fallback filename
    pub title: String,
}

/// What happens after a download is requested
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadDecision {
    /// Lossy format: start right away
    ProceedImmediately,
    /// Lossless format: wait for confirm or cancel
    AwaitingConfirmation,
}

/// Observable state of a single download key
///
/// `Saved` and `Failed` are passed through on the way back to `Idle`; they are
/// reported by the download call's result and by [`Event::DownloadSaved`] or
/// [`Event::DownloadFailed`], not by a state query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// No pending work
    Idle,
    /// Waiting for lossless confirmation
    Confirming,
    /// Transport request or save outstanding
    InFlight,
}

/// Advisory format metadata returned by `GET /formats`
///
/// Display-only; nothing in the client relies on it for correctness.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFormats {
    /// Formats grouped by processing method (`fast`, `quality`)
    #[serde(default)]
    pub formats: HashMap<String, MethodFormats>,
    /// Accepted bitrates
    #[serde(default)]
    pub bitrates: Vec<String>,
    /// Accepted methods
    #[serde(default)]
    pub methods: Vec<String>,
}

/// One processing method's entry in [`ServerFormats`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodFormats {
    /// Formats produced by this method
    #[serde(default)]
    pub formats: Vec<String>,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Intended audience
    #[serde(default)]
    pub recommended_for: String,
}

/// A file written by the saver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    /// Key of the downloaded result
    pub key: DownloadKey,
    /// Where the bytes ended up
    pub path: PathBuf,
    /// Number of bytes written
    pub size_bytes: u64,
}

/// Event emitted during search and download lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A search request was issued
    SearchStarted {
        /// Trimmed query text
        query: String,
    },

    /// A search stored new results
    SearchCompleted {
        /// Trimmed query text
        query: String,
        /// Number of results stored
        count: usize,
    },

    /// A search ended with an error (including an empty result set)
    SearchFailed {
        /// Trimmed query text
        query: String,
        /// Error message
        error: String,
    },

    /// A lossless download is waiting for confirmation
    ConfirmationRequired {
        /// Download key
        key: DownloadKey,
        /// Result title
        title: String,
        /// Selected lossless format
        format: AudioFormat,
    },

    /// The pending confirmation was dismissed
    ConfirmationCancelled {
        /// Download key that was pending, if any
        key: Option<DownloadKey>,
    },

    /// Download request issued
    DownloadStarted {
        /// Download key
        key: DownloadKey,
        /// Result title
        title: String,
    },

    /// Download written to disk
    DownloadSaved {
        /// Download key
        key: DownloadKey,
        /// Final path
        path: PathBuf,
    },

    /// Download failed
    DownloadFailed {
        /// Download key
        key: DownloadKey,
        /// Error message
        error: String,
    },

    /// The session error was cleared (retry or home)
    ErrorCleared,
}
