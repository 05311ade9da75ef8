//! Persisting downloaded bytes
//!
//! The orchestrator only knows the [`FileSaver`] capability: "store these
//! bytes under this suggested filename". [`DirectorySaver`] writes into a
//! directory on disk.

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Stores downloaded bytes under a suggested filename
#[async_trait]
pub trait FileSaver: Send + Sync {
    /// Persist `bytes`, returning where they were stored
    ///
    /// Failures are reported as [`Error::Save`].
    async fn save(&self, filename: &str, bytes: Vec<u8>) -> Result<PathBuf>;
}

/// [`FileSaver`] that writes into a directory
#[derive(Clone, Debug)]
pub struct DirectorySaver {
    dir: PathBuf,
    collision: FileCollisionAction,
}

impl DirectorySaver {
    /// Save into `dir`, creating it on first use
    pub fn new(dir: impl Into<PathBuf>, collision: FileCollisionAction) -> Self {
        Self {
            dir: dir.into(),
            collision,
        }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileSaver for DirectorySaver {
    async fn save(&self, filename: &str, bytes: Vec<u8>) -> Result<PathBuf> {
        let save_error = |reason: String| Error::Save {
            filename: filename.to_string(),
            reason,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            save_error(format!(
                "failed to create directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let desired = self.dir.join(sanitize_filename(filename));
        let (path, mut file) = create_unique(&desired, self.collision).await?;

        let written = async {
            file.write_all(&bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            tokio::fs::remove_file(&path).await.ok();
            return Err(save_error(format!(
                "failed to write {}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "file saved");
        Ok(path)
    }
}

/// Make a server-suggested filename safe to join onto a directory
///
/// Path separators, control characters and characters Windows forbids are
/// replaced with `_`; leading dots and surrounding whitespace are removed.
/// An unusable result becomes `audio`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = replaced.trim().trim_start_matches('.').trim();
    if cleaned.is_empty() {
        "audio".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Create the file for `path`, handling collisions according to `action`
///
/// For `Rename`, tries `path`, then ` (1)`, ` (2)`, … before the extension,
/// taking the first name that did not exist. For `Skip`, fails if the file
/// exists. For `Overwrite`, truncates any existing file.
///
/// The name is claimed by the create itself, so concurrent callers never
/// end up with the same file.
pub async fn create_unique(
    path: &Path,
    action: FileCollisionAction,
) -> Result<(PathBuf, tokio::fs::File)> {
    let collision = |reason: String| Error::Save {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        reason,
    };

    match action {
        FileCollisionAction::Overwrite => {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .await
                .map_err(|e| collision(format!("failed to open {}: {}", path.display(), e)))?;
            Ok((path.to_path_buf(), file))
        }
        FileCollisionAction::Skip => match create_new(path).await {
            Ok(file) => Ok((path.to_path_buf(), file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(collision("file already exists".to_string()))
            }
            Err(e) => Err(collision(format!("failed to create {}: {}", path.display(), e))),
        },
        FileCollisionAction::Rename => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| collision("cannot extract file stem".to_string()))?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path
                .parent()
                .ok_or_else(|| collision("cannot extract parent directory".to_string()))?;

            for i in 0..=MAX_RENAME_ATTEMPTS {
                let candidate = match (i, extension) {
                    (0, _) => path.to_path_buf(),
                    (i, Some(ext)) => parent.join(format!("{stem} ({i}).{ext}")),
                    (i, None) => parent.join(format!("{stem} ({i})")),
                };
                match create_new(&candidate).await {
                    Ok(file) => return Ok((candidate, file)),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                    Err(e) => {
                        return Err(collision(format!(
                            "failed to create {}: {}",
                            candidate.display(),
                            e
                        )));
                    }
                }
            }

            Err(collision("could not find a free filename".to_string()))
        }
    }
}

async fn create_new(path: &Path) -> std::io::Result<tokio::fs::File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}
