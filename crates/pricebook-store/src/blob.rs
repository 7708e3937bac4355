//! Blob store abstraction and filesystem implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by blob storage.
#[derive(Debug, Error)]
pub enum BlobError {
    /// No blob exists under the requested key.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// An I/O failure while reading or writing.
    #[error("blob I/O failure on {key}: {reason}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying failure description.
        reason: String,
    },
}

/// A minimal key→bytes store. Keys use `/` as a hierarchy separator.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes a blob, replacing any existing one under the same key.
    ///
    /// # Errors
    ///
    /// Returns `Io` on write failure.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError>;

    /// Reads a blob.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key does not exist, `Io` otherwise.
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Lists all keys under a prefix, sorted ascending.
    ///
    /// A prefix nothing lives under yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns `Io` on listing failure.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobError>;
}

/// Filesystem-backed blob store: one file per key under a root directory.
///
/// Writes go to a temp file first and are renamed into place, so a reader
/// never observes a half-written blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in key.split('/') {
            path.push(part);
        }
        path
    }

    fn io_error(key: &str, err: &std::io::Error) -> BlobError {
        BlobError::Io {
            key: key.to_owned(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(key, &e))?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Self::io_error(key, &e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(key, &e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(Self::io_error(key, &e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobError> {
        let mut keys = Vec::new();
        let mut pending: Vec<PathBuf> = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Self::io_error(prefix, &e)),
            };
            loop {
                let entry = entries
                    .next_entry()
                    .await
                    .map_err(|e| Self::io_error(prefix, &e))?;
                let Some(entry) = entry else { break };
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Some(key) = relative_key(&self.root, &path)
                    && key.starts_with(prefix)
                {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
