//! # v2a-dl
//!
//! Client library for a video-to-audio conversion service: search for
//! videos, pick an output format, bitrate and processing method, and save
//! the converted audio.
//!
//! ## Design Philosophy
//!
//! v2a-dl is designed to be:
//! - **Library-first** - The `v2a` binary is a thin wrapper over [`Client`]
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Testable** - The network and the disk sit behind the [`Transport`]
//!   and [`FileSaver`] traits
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! Lossless formats (ALAC, FLAC, WAV) produce large files, so a download in
//! one of them waits for an explicit confirmation before anything is sent.
//!
//! ## Quick Start
//!
//! ```no_run
//! use v2a_dl::{AudioFormat, Client, Config, DownloadProgress};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     client.search("lofi hip hop").await?;
//!     let first = client.results().remove(0);
//!
//!     client.select_format(AudioFormat::Flac);
//!     if client.download_result(&first).await? == DownloadProgress::AwaitingConfirmation {
//!         client.confirm_download().await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// The client facade
pub mod client;
/// Configuration types
pub mod config;
/// Lossless confirmation gate
pub mod confirmation;
/// Error types
pub mod error;
/// Format classification
pub mod format_policy;
/// Download orchestration
pub mod orchestrator;
/// Response header and payload parsing
pub mod response_parser;
/// Persisting downloaded files
pub mod save;
/// Search controller
pub mod search;
/// Session state aggregate
pub mod session;
/// In-flight download tracking
pub mod tracker;
/// Conversion service transport
pub mod transport;
/// Core types and events
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use client::Client;
pub use config::{Config, FileCollisionAction, OutputConfig, ServerConfig};
pub use error::{DownloadError, Error, ErrorRecord, ParseError, Result};
pub use orchestrator::{DownloadOrchestrator, DownloadProgress};
pub use save::{DirectorySaver, FileSaver};
pub use search::{SearchController, SearchOutcome};
pub use session::{Session, SessionState};
pub use tracker::{DownloadTracker, InFlightGuard, InFlightSet};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use types::{
    AudioFormat, Bitrate, DownloadDecision, DownloadKey, DownloadState, Event, FormatSelection,
    Method, MethodFormats, PendingConfirmation, SavedFile, SearchQuery, ServerFormats,
    VideoResult,
};
