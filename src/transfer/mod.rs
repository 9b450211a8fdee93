//! Temp artifact lifecycle: unique per-request paths, reading the produced file
//! back, and best-effort removal on every exit path.

use std::path::{Path, PathBuf};

use crate::extractors::content_type_for;
use crate::utils::generate_unique_filename;
use crate::{BridgeError, Result};

/// Bytes read back from a produced file
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub path: PathBuf,
}

/// The on-disk namespace one request owns.
///
/// The stem is unique per request, not per video, so concurrent requests for the
/// same video never touch each other's files. Dropping the artifact sweeps every
/// file sharing the stem, which covers tool leftovers (`.part`, `.ytdl`) and
/// requests cancelled mid-extraction.
#[derive(Debug)]
pub struct TempArtifact {
    dir: PathBuf,
    stem: String,
}

impl TempArtifact {
    pub fn allocate(dir: &Path, video_id: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stem: generate_unique_filename(video_id),
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Output template for the extraction tool
    pub fn template(&self) -> PathBuf {
        self.dir.join(format!("{}.%(ext)s", self.stem))
    }

    /// Remove anything left behind under this request's stem
    pub fn sweep(&self) -> usize {
        let entries = match fs_err::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cleanup skipped: {}", e);
                return 0;
            }
        };

        let prefix = format!("{}.", self.stem);
        let mut removed = 0;
        for entry in entries.flatten() {
            let owned = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix));
            if owned && discard_blocking(&entry.path()) {
                removed += 1;
            }
        }
        removed
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        let removed = self.sweep();
        if removed > 0 {
            tracing::debug!("Swept {} leftover file(s) for {}", removed, self.stem);
        }
    }
}

/// Find the produced file: the expected path first, then the same stem with each
/// candidate extension in order.
pub async fn locate_artifact(expected: &Path, possible_extensions: &[&str]) -> Option<PathBuf> {
    if is_file(expected).await {
        return Some(expected.to_path_buf());
    }

    for ext in possible_extensions {
        let candidate = expected.with_extension(ext);
        if is_file(&candidate).await {
            return Some(candidate);
        }
    }

    None
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Read the produced file fully into memory, then remove it.
///
/// Removal is attempted whether or not the read succeeded.
pub async fn transfer_and_cleanup(expected: &Path, possible_extensions: &[&str]) -> Result<AudioPayload> {
    let path = locate_artifact(expected, possible_extensions)
        .await
        .ok_or_else(|| BridgeError::FileNotFound(expected.display().to_string()))?;

    let read = fs_err::tokio::read(&path).await;
    discard_artifact(&path).await;

    let bytes = read.map_err(|e| BridgeError::Internal(format!("Failed to read downloaded file: {}", e)))?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());

    Ok(AudioPayload {
        bytes,
        content_type: content_type_for(&path),
        path,
    })
}

/// Best-effort removal: failures are logged and never escalated.
pub async fn discard_artifact(path: &Path) -> bool {
    match fs_err::tokio::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Cleanup failed, leaving temp file behind: {}", e);
            false
        }
    }
}

fn discard_blocking(path: &Path) -> bool {
    match fs_err::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Cleanup failed, leaving temp file behind: {}", e);
            false
        }
    }
}
