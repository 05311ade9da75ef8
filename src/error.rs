//! Error types for v2a-dl
//!
//! This module provides the error taxonomy for the client:
//! - Transport and HTTP status failures for search and formats requests
//! - Payload shape errors ([`ParseError`]) wrapped as `MalformedResponse`
//! - Download and save failures with the affected filename
//! - [`ErrorRecord`], the user-facing message kept in the session

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for v2a-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for v2a-dl
///
/// Every operation recovers its own failures at its boundary: the error is
/// recorded in the session as an [`ErrorRecord`] and also returned to the
/// caller. None of them is fatal; the user can always retry.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "server.base_url")
        key: Option<String>,
    },

    /// The service could not be reached
    #[error("Failed to connect to server: {cause}")]
    Transport {
        /// Underlying transport failure
        cause: String,
    },

    /// The service answered with a non-2xx status
    #[error("Search failed with status: {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// The response body did not have the expected shape
    #[error("Invalid response format from server")]
    MalformedResponse(#[from] ParseError),

    /// A valid but empty result set
    #[error("No videos found. Try searching with different terms.")]
    NoResults,

    /// Download request failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The file-save capability rejected the bytes
    #[error("failed to save {filename}: {reason}")]
    Save {
        /// Filename that was being written
        filename: String,
        /// Why the save failed
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Search payload shape errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body is not JSON at all
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Body is JSON but not an array
    #[error("response body is not a sequence")]
    NotASequence,

    /// An array element could not be read as a result object
    #[error("result {index} is not a valid entry: {reason}")]
    InvalidItem {
        /// Position in the array
        index: usize,
        /// Decoder message
        reason: String,
    },
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Conversion service answered with a non-2xx status
    #[error("Download failed with status: {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The download request never produced a response
    #[error("Download failed: {cause}")]
    Transport {
        /// Underlying transport failure
        cause: String,
    },
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Transport { .. } => "transport_error",
            Error::Http { .. } => "http_error",
            Error::MalformedResponse(_) => "malformed_response",
            Error::NoResults => "no_results",
            Error::Download(DownloadError::Status { .. }) => "download_status",
            Error::Download(DownloadError::Transport { .. }) => "download_transport",
            Error::Save { .. } => "save_failure",
            Error::Io(_) => "io_error",
        }
    }

    /// Whether this is a fault rather than an informational condition
    ///
    /// An empty result set is surfaced to the user but is not a failure.
    pub fn is_fault(&self) -> bool {
        !matches!(self, Error::NoResults)
    }

    /// Rewrap a transport-level failure as a download failure
    pub(crate) fn into_download_failure(self) -> Error {
        match self {
            Error::Transport { cause } => Error::Download(DownloadError::Transport { cause }),
            Error::Http { status } => Error::Download(DownloadError::Status { status }),
            other => other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport {
            cause: err.to_string(),
        }
    }
}

/// User-facing error kept in the session until retry or home
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Message shown in the error view
    pub message: String,
}

impl ErrorRecord {
    /// Message used when the startup formats check fails
    pub const CONNECTIVITY: &'static str =
        "Failed to connect to server. Please check your connection and try again.";

    /// Create a record with an arbitrary message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Connectivity failure reported by the formats check
    pub fn connectivity() -> Self {
        Self::new(Self::CONNECTIVITY)
    }
}

impl From<&Error> for ErrorRecord {
    fn from(error: &Error) -> Self {
        Self::new(error.to_string())
    }
}
