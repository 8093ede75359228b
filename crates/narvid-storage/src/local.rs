//! Local filesystem storage backend.
//!
//! Development/test stand-in for remote object storage. Files land
//! under a root directory keyed by object key; the ETag is the
//! SHA-256 hex digest of the stored bytes so strict ETag mode behaves
//! identically against both backends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::provider::{gate_file_size, StorageProvider, UploadObserver, UploadResult};

/// Configuration for the local backend.
#[derive(Debug, Clone)]
pub struct LocalStorageConfig {
    /// Root directory objects are stored under
    pub root_dir: PathBuf,
    /// Base of the public URLs returned for stored objects
    pub public_base_url: String,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
}

impl LocalStorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            root_dir: std::env::var("LOCAL_STORAGE_DIR")
                .map(PathBuf::from)
                .map_err(|_| StorageError::config_error("LOCAL_STORAGE_DIR not set"))?,
            public_base_url: std::env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/assets".to_string()),
            max_upload_bytes: std::env::var("STORAGE_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2 * 1024 * 1024 * 1024),
        })
    }
}

/// Local-disk storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    config: LocalStorageConfig,
}

impl LocalStorage {
    pub fn new(config: LocalStorageConfig) -> Self {
        Self { config }
    }

    async fn store(&self, path: &Path, object_key: &str, content_type: &str) -> StorageResult<UploadResult> {
        let size_bytes = gate_file_size(path, self.config.max_upload_bytes).await?;

        let dest = self.config.root_dir.join(object_key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Storing {} as {}", path.display(), dest.display());
        tokio::fs::copy(path, &dest).await?;

        let etag = digest_file(&dest).await?;
        let public_url = format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            object_key
        );

        info!(object_key, size_bytes, "Stored object locally");

        Ok(UploadResult {
            object_key: object_key.to_string(),
            public_url,
            etag,
            size_bytes,
            content_type: content_type.to_string(),
        })
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn upload_file(
        &self,
        path: &Path,
        object_key: &str,
        content_type: &str,
        observer: &dyn UploadObserver,
    ) -> StorageResult<UploadResult> {
        observer.upload_started(object_key);

        match self.store(path, object_key, content_type).await {
            Ok(result) => {
                observer.upload_done(object_key, &result);
                Ok(result)
            }
            Err(e) => {
                observer.upload_failed(object_key, &e.to_string());
                Err(e)
            }
        }
    }
}

/// SHA-256 hex digest of a file, read in chunks.
async fn digest_file(path: &Path) -> StorageResult<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::NoopObserver;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingObserver {
        started: AtomicU32,
        done: AtomicU32,
        failed: AtomicU32,
    }

    impl CountingObserver {
        fn new() -> Self {
            Self {
                started: AtomicU32::new(0),
                done: AtomicU32::new(0),
                failed: AtomicU32::new(0),
            }
        }
    }

    impl UploadObserver for CountingObserver {
        fn upload_started(&self, _object_key: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn upload_done(&self, _object_key: &str, _result: &UploadResult) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
        fn upload_failed(&self, _object_key: &str, _reason: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(root: &Path, max: u64) -> LocalStorageConfig {
        LocalStorageConfig {
            root_dir: root.to_path_buf(),
            public_base_url: "http://localhost:8080/assets/".to_string(),
            max_upload_bytes: max,
        }
    }

    #[tokio::test]
    async fn test_upload_copies_file_and_digests() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("video.mp4");
        tokio::fs::write(&src, b"frames").await.unwrap();

        let storage = LocalStorage::new(config(&dir.path().join("store"), 1024));
        let observer = CountingObserver::new();

        let result = storage
            .upload_file(&src, "videos/v1/s1/j1/video.mp4", "video/mp4", &observer)
            .await
            .unwrap();

        assert_eq!(result.size_bytes, 6);
        assert_eq!(result.etag.len(), 64);
        assert_eq!(
            result.public_url,
            "http://localhost:8080/assets/videos/v1/s1/j1/video.mp4"
        );
        assert!(dir.path().join("store/videos/v1/s1/j1/video.mp4").exists());
        assert_eq!(observer.started.load(Ordering::SeqCst), 1);
        assert_eq!(observer.done.load(Ordering::SeqCst), 1);
        assert_eq!(observer.failed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reupload_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.srt");
        let storage = LocalStorage::new(config(&dir.path().join("store"), 1024));

        tokio::fs::write(&src, b"one").await.unwrap();
        let first = storage
            .upload_file(&src, "k/subtitle.srt", "application/x-subrip", &NoopObserver)
            .await
            .unwrap();

        tokio::fs::write(&src, b"two").await.unwrap();
        let second = storage
            .upload_file(&src, "k/subtitle.srt", "application/x-subrip", &NoopObserver)
            .await
            .unwrap();

        // deterministic key, new content wins
        assert_eq!(first.public_url, second.public_url);
        assert_ne!(first.etag, second.etag);
    }

    #[tokio::test]
    async fn test_quota_exceeded_notifies_observer() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("big.bin");
        tokio::fs::write(&src, vec![0u8; 100]).await.unwrap();

        let storage = LocalStorage::new(config(&dir.path().join("store"), 10));
        let observer = CountingObserver::new();

        let err = storage
            .upload_file(&src, "k/big.bin", "application/octet-stream", &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(observer.failed.load(Ordering::SeqCst), 1);
        assert_eq!(observer.done.load(Ordering::SeqCst), 0);
    }
}
