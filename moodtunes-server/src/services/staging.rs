//! Local staging area for uploads in flight
//!
//! Every upload is written to its own file named by a fresh UUIDv4 and
//! opened with `create_new`, so concurrent uploads never share a file and
//! no locking is needed.

use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 8;

/// Directory holding staged upload files
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the staging directory if missing
    pub async fn ensure_exists(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Write an upload payload to a new staged file
    pub async fn stage(&self, data: &[u8], original_name: Option<&str>) -> io::Result<StagedFile> {
        let path = self
            .dir
            .join(staged_file_name(Uuid::new_v4(), original_name));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        // Owned from here on: an error or a cancelled write removes the file on drop
        let staged = StagedFile {
            path,
            removed: false,
        };
        if let Err(e) = write_all(&mut file, data).await {
            drop(file);
            return Err(e);
        }

        tracing::debug!(path = %staged.path.display(), bytes = data.len(), "Staged upload");
        Ok(staged)
    }
}

async fn write_all(file: &mut tokio::fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

/// `<uuid>[.<ext>]`, keeping the original extension only if it is short and
/// alphanumeric
fn staged_file_name(id: Uuid, original_name: Option<&str>) -> String {
    match original_name.and_then(safe_extension) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

fn safe_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// A staged upload file, live for one upload request
///
/// Dropping it without [`StagedFile::discard`] removes the file
/// synchronously, so a cancelled request never leaves it behind.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension of the staged file, including the dot, or empty
    pub fn extension_suffix(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default()
    }

    /// Remove the staged file, best-effort
    ///
    /// Failures are logged and never returned.
    pub async fn discard(mut self) {
        let result = tokio::fs::remove_file(&self.path).await;
        self.removed = true;
        log_removal(&self.path, result);
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.removed {
            tracing::debug!(path = %self.path.display(), "Staged file dropped before discard");
            log_removal(&self.path, std::fs::remove_file(&self.path));
        }
    }
}

fn log_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed staged file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Staged file already gone")
        }
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove staged file"
        ),
    }
}
