//! Storage provider trait and upload observer.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Result of a durable object upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    /// Object key within the bucket/namespace
    pub object_key: String,
    /// Public URL of the stored object
    pub public_url: String,
    /// Integrity token returned by storage. Empty only in relaxed
    /// ETag mode.
    pub etag: String,
    /// Object size in bytes
    pub size_bytes: u64,
    /// MIME type
    pub content_type: String,
}

/// Coarse per-object upload progress observer.
///
/// Events are per file, not per byte. Default methods are no-ops so
/// observers implement only what they need.
pub trait UploadObserver: Send + Sync {
    fn upload_started(&self, _object_key: &str) {}
    fn upload_done(&self, _object_key: &str, _result: &UploadResult) {}
    fn upload_failed(&self, _object_key: &str, _reason: &str) {}
}

/// Observer that ignores all events.
#[derive(Debug, Default, Clone)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

/// Durable object storage.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Upload a local file under `object_key` and return its public
    /// URL and integrity metadata. Implementations notify the
    /// observer of start/done/failure for the object.
    async fn upload_file(
        &self,
        path: &Path,
        object_key: &str,
        content_type: &str,
        observer: &dyn UploadObserver,
    ) -> StorageResult<UploadResult>;
}

/// Check a local file against the configured upload limit before any
/// network traffic, returning its size.
pub(crate) async fn gate_file_size(path: &Path, max_bytes: u64) -> StorageResult<u64> {
    let metadata = tokio::fs::metadata(path).await?;
    let size_bytes = metadata.len();
    if size_bytes > max_bytes {
        return Err(StorageError::QuotaExceeded {
            size_bytes,
            max_bytes,
        });
    }
    Ok(size_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_size_gate_rejects_oversize_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        tokio::fs::write(&path, vec![0u8; 1024]).await.unwrap();

        let err = gate_file_size(&path, 512).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                size_bytes: 1024,
                max_bytes: 512
            }
        ));
    }

    #[tokio::test]
    async fn test_size_gate_passes_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.bin");
        tokio::fs::write(&path, b"data").await.unwrap();

        assert_eq!(gate_file_size(&path, 512).await.unwrap(), 4);
    }
}
