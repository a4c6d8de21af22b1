// SPDX-License-Identifier: MPL-2.0

//! Delivering exported files and tracking temporary blobs

use crate::constants::downloads;
use crate::errors::ExportError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Receives exported files (strip PNGs, recorded clips)
pub trait DownloadSink: Send + Sync {
    /// Hand `bytes` to the user under `filename`; returns where it ended up
    fn deliver(&self, filename: &str, mime: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Writes downloads into a directory, never overwriting earlier files
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/Downloads/Photobooth`, or `~/Photobooth` without a download dir
    pub fn default_dir() -> PathBuf {
        dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(downloads::DEFAULT_FOLDER)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for DirectoryDownloads {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

impl DownloadSink for DirectoryDownloads {
    fn deliver(&self, filename: &str, mime: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = unique_path(&self.dir, filename);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), mime, size_kb = bytes.len() / 1024, "Download saved");
        Ok(path)
    }
}

/// `name.ext`, then `name (1).ext`, `name (2).ext`, ... until unused
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Handle to a registered blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(Uuid);

impl std::fmt::Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

/// Packaged bytes with their MIME type
#[derive(Debug, Clone)]
pub struct Blob {
    pub mime: String,
    pub data: Arc<[u8]>,
}

/// Temporary resources that live until revoked
///
/// Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<HashMap<BlobId, Blob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, mime: impl Into<String>, data: Vec<u8>) -> BlobId {
        let id = BlobId(Uuid::new_v4());
        let blob = Blob {
            mime: mime.into(),
            data: Arc::from(data.into_boxed_slice()),
        };
        debug!(%id, mime = %blob.mime, bytes = blob.data.len(), "Blob registered");
        self.lock().insert(id, blob);
        id
    }

    pub fn get(&self, id: BlobId) -> Option<Blob> {
        self.lock().get(&id).cloned()
    }

    pub fn is_live(&self, id: BlobId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// Release a blob now; returns whether it was still registered
    pub fn revoke(&self, id: BlobId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(%id, "Blob revoked");
        }
        removed
    }

    /// Release a blob after `delay` on the tokio runtime
    pub fn revoke_after(&self, id: BlobId, delay: Duration) -> tokio::task::JoinHandle<bool> {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.revoke(id)
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<BlobId, Blob>> {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_downloads_get_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path());

        let first = sink.deliver("photobooth.png", "image/png", b"one").unwrap();
        let second = sink.deliver("photobooth.png", "image/png", b"two").unwrap();

        assert_eq!(first.file_name().unwrap(), "photobooth.png");
        assert_eq!(second.file_name().unwrap(), "photobooth (1).png");
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path().join("nested/out"));
        let path = sink.deliver("clip.webm", "video/webm", b"x").unwrap();
        assert!(path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn revocation_is_deferred() {
        let registry = BlobRegistry::new();
        let id = registry.register("video/webm", vec![1, 2, 3]);

        let handle = registry.revoke_after(id, Duration::from_millis(1000));
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(registry.is_live(id));

        assert!(handle.await.unwrap());
        assert!(!registry.is_live(id));
    }
}
