//! Pluggable blob storage for the prompt history.
//!
//! The history is one serialized JSON blob under a single well-known
//! location. Backends only move that blob around; `FileStorage` is the real
//! one, `MemoryStorage` exists so tests (and the quota path) never touch the
//! filesystem.

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend's size limit would be exceeded by this write. This is the
    /// only persistence failure surfaced to the user.
    #[error("Storage is full")]
    QuotaExceeded,
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single-blob storage backend.
pub trait StorageBackend: Send {
    /// Read the current blob, `None` when nothing has been persisted yet.
    fn read(&self) -> Result<Option<String>, StorageError>;
    /// Replace the blob.
    fn write(&mut self, blob: &str) -> Result<(), StorageError>;
    /// Remove the blob unconditionally; absent is not an error.
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Blob stored as a single file, written atomically (tmp + rename).
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            quota_bytes: None,
        }
    }

    /// Cap the blob size, mimicking browser-storage quotas.
    pub fn with_quota(path: PathBuf, quota_bytes: usize) -> Self {
        Self {
            path,
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StorageBackend for FileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn write(&mut self, blob: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            if blob.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, blob)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!("Wrote {} bytes to {:?}", blob.len(), self.path);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory backend for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blob: Option<String>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            blob: None,
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.blob.clone())
    }

    fn write(&mut self, blob: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            if blob.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        self.blob = Some(blob.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.blob = None;
        Ok(())
    }
}
