// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ephemeral file stores backing the pipeline.
//
// `UploadStore` resolves opaque file ids to readable sources; `OutputStore`
// persists output buffers under addressable URLs. Both offer plain
// write/read/stat semantics with no retry or locking — output filenames are
// request-scoped and written exactly once, and a retention sweep deletes
// everything after a fixed age.

use std::path::{Path, PathBuf};

use bildwerk_core::error::{BildwerkError, Result};
use tracing::{debug, instrument};

/// Read-side store mapping upload ids to files on disk.
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open (and create if needed) the uploads directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        std::fs::create_dir_all(&root).ok();
        Self { root }
    }

    /// Directory this store reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an id to a path inside the store, rejecting traversal attempts.
    fn guarded_path(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
            debug!(id, "rejected unsafe file id");
            return None;
        }
        Some(self.root.join(id))
    }

    /// Resolve an id to an existing file, or `None` when it is unsafe or
    /// missing — missing inputs are skipped by callers, never errored.
    pub async fn resolve(&self, id: &str) -> Option<PathBuf> {
        let path = self.guarded_path(id)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Read a previously resolved file, returning its bytes and its on-disk
    /// size at read time.
    pub async fn read(&self, path: &Path) -> Result<(Vec<u8>, u64)> {
        let size = tokio::fs::metadata(path).await?.len();
        let bytes = tokio::fs::read(path).await?;
        Ok((bytes, size))
    }
}

/// Write-side store persisting output buffers under public URLs.
pub struct OutputStore {
    root: PathBuf,
    prefix: String,
}

impl OutputStore {
    /// Open (and create if needed) the output directory, with the URL
    /// prefix outputs are served under.
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let root = root.into();
        std::fs::create_dir_all(&root).ok();
        Self {
            root,
            prefix: prefix.into(),
        }
    }

    /// Directory this store writes to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL for a filename in this store.
    pub fn url_of(&self, filename: &str) -> String {
        format!("{}/{}", self.prefix, filename)
    }

    /// Persist a buffer and return its public URL.
    ///
    /// Write failures are request-level errors — the pipeline never skips
    /// past a broken output store.
    #[instrument(skip(self, bytes), fields(filename, bytes_len = bytes.len()))]
    pub async fn persist(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let path = self.root.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| BildwerkError::Storage(format!("write {}: {err}", path.display())))?;
        debug!("Output persisted");
        Ok(self.url_of(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_rejects_traversal_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        assert!(store.resolve("../etc/passwd").await.is_none());
        assert!(store.resolve("a/b.png").await.is_none());
        assert!(store.resolve("").await.is_none());
    }

    #[tokio::test]
    async fn resolve_finds_existing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.png"), b"x").unwrap();
        let store = UploadStore::new(dir.path());

        assert!(store.resolve("present.png").await.is_some());
        assert!(store.resolve("absent.png").await.is_none());
    }

    #[tokio::test]
    async fn read_reports_on_disk_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.bin"), vec![0u8; 1234]).unwrap();
        let store = UploadStore::new(dir.path());

        let path = store.resolve("f.bin").await.unwrap();
        let (bytes, size) = store.read(&path).await.unwrap();
        assert_eq!(bytes.len(), 1234);
        assert_eq!(size, 1234);
    }

    #[tokio::test]
    async fn persist_writes_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "/output");

        let url = store.persist("out.png", b"pixels").await.unwrap();
        assert_eq!(url, "/output/out.png");
        assert_eq!(std::fs::read(dir.path().join("out.png")).unwrap(), b"pixels");
    }
}
