//! Configuration types for v2a-dl

use crate::error::{Error, Result};
use crate::types::FormatSelection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Conversion service connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Service origin; endpoint paths are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (None = wait for the service indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub timeout: Option<Duration>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

impl ServerConfig {
    /// The base URL as a directory-style URL (always ends in `/`)
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.base_url.trim()).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
            key: Some("server.base_url".to_string()),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("base URL must use http or https, got '{}'", url.scheme()),
                key: Some("server.base_url".to_string()),
            });
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Where and how downloaded files are written
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Download directory (default: the user's download folder, else "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// File collision handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// What to do when the target file already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc.
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Fail the save
    Skip,
}

/// Main configuration for the client
///
/// Every section is optional in the TOML file:
///
/// ```toml
/// [server]
/// base_url = "https://video2audioconverter.onrender.com"
/// timeout = 300
///
/// [output]
/// download_dir = "/home/me/Music"
/// file_collision = "rename"
///
/// [defaults]
/// format = "mp3"
/// bitrate = 320
/// method = "auto"
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Output location
    #[serde(default)]
    pub output: OutputConfig,

    /// Initial format selection for a new session
    #[serde(default)]
    pub defaults: FormatSelection,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config {
            message: format!("failed to parse config: {e}"),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| Error::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { message, key } => Error::Config {
                message: format!("{} ({})", message, path.display()),
                key,
            },
            other => other,
        })
    }

    /// Load `path` if given; otherwise the default file, or defaults if it does not exist
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path).await;
        }

        match Self::default_path() {
            Some(default) if default.exists() => {
                tracing::debug!(path = %default.display(), "loading config");
                Self::load(&default).await
            }
            _ => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Platform config location (e.g. `~/.config/v2a-dl/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "v2a-dl")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check settings that would otherwise only fail on first use
    pub fn validate(&self) -> Result<()> {
        self.server.parsed_base_url()?;
        if self.output.download_dir.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "download directory must not be empty".to_string(),
                key: Some("output.download_dir".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://video2audioconverter.onrender.com".to_string()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_download_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
