//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// The retryable/non-retryable split drives the upload retry policy:
/// 5xx and transport errors are worth retrying, everything else fails
/// the call immediately.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Upload exceeds size limit: {size_bytes} bytes (max {max_bytes})")]
    QuotaExceeded { size_bytes: u64, max_bytes: u64 },

    #[error("Upload response carried no ETag for {0}")]
    MissingEtag(String),

    #[error("Storage rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage upstream error with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Map a transport-level reqwest failure (connect refused, timeout).
    pub fn network(err: &reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }

    /// Classify an HTTP status: 4xx is a client error that retrying
    /// cannot fix, 5xx is upstream trouble worth retrying.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if (400..500).contains(&status) {
            Self::Rejected {
                status,
                message: message.into(),
            }
        } else {
            Self::Upstream {
                status,
                message: message.into(),
            }
        }
    }

    /// Check if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Upstream { .. } | StorageError::Network(_))
    }
}
