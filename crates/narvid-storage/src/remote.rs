//! Remote storage backend speaking the presigned-URL envelope.
//!
//! Upload flow, each network call retried independently:
//! 1. request a short-lived signed upload target from the storage
//!    authority (object key + content type + size);
//! 2. stream the local file as the body of a PUT to the signed target;
//! 3. notify the authority of completion with ETag, size, and content
//!    type so it can persist metadata;
//! 4. return the public URL.
//!
//! The file is streamed from disk for every PUT attempt; it is never
//! held in memory.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::provider::{gate_file_size, StorageProvider, UploadObserver, UploadResult};
use crate::retry::{with_retry, RetryConfig};

/// Configuration for the remote backend.
#[derive(Debug, Clone)]
pub struct RemoteStorageConfig {
    /// Base URL of the storage authority issuing presigned targets
    pub authority_url: String,
    /// Bearer token for authority calls
    pub api_token: Option<String>,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
    /// Strict mode fails uploads whose PUT response carries no ETag.
    /// Relaxed mode (non-production only) records an empty ETag with
    /// a warning.
    pub strict_etag: bool,
    /// Request timeout for authority and upload calls
    pub request_timeout: Duration,
    /// Retry policy shared by the three envelope calls
    pub retry: RetryConfig,
}

impl RemoteStorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            authority_url: std::env::var("STORAGE_AUTHORITY_URL")
                .map_err(|_| StorageError::config_error("STORAGE_AUTHORITY_URL not set"))?,
            api_token: std::env::var("STORAGE_API_TOKEN").ok(),
            max_upload_bytes: std::env::var("STORAGE_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2 * 1024 * 1024 * 1024),
            strict_etag: std::env::var("STORAGE_STRICT_ETAG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            request_timeout: Duration::from_secs(
                std::env::var("STORAGE_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            retry: RetryConfig::new("remote_storage"),
        })
    }
}

/// Presign request sent to the storage authority.
#[derive(Debug, Serialize)]
struct PresignRequest<'a> {
    object_key: &'a str,
    content_type: &'a str,
    content_length: u64,
}

/// Signed upload target issued by the authority.
#[derive(Debug, Clone, Deserialize)]
struct PresignResponse {
    upload_url: String,
    public_url: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[allow(dead_code)]
    expires_sec: u64,
}

/// Completion notice sent after a successful PUT.
#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    object_key: &'a str,
    etag: &'a str,
    size_bytes: u64,
    content_type: &'a str,
    public_url: &'a str,
}

/// Remote storage provider.
#[derive(Clone)]
pub struct RemoteStorage {
    http: reqwest::Client,
    config: RemoteStorageConfig,
}

impl RemoteStorage {
    /// Create a new remote storage client.
    pub fn new(config: RemoteStorageConfig) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::config_error(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(RemoteStorageConfig::from_env()?)
    }

    fn authority_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.authority_url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Request a signed upload target (one attempt).
    async fn presign(
        &self,
        object_key: &str,
        content_type: &str,
        content_length: u64,
    ) -> StorageResult<PresignResponse> {
        let response = self
            .with_auth(self.http.post(self.authority_endpoint("presign")))
            .json(&PresignRequest {
                object_key,
                content_type,
                content_length,
            })
            .send()
            .await
            .map_err(|e| StorageError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(status.as_u16(), body));
        }

        response.json().await.map_err(|e| StorageError::network(&e))
    }

    /// Stream the file to the signed target (one attempt) and return
    /// the response ETag.
    async fn put_object(
        &self,
        path: &Path,
        presign: &PresignResponse,
        content_type: &str,
        content_length: u64,
        object_key: &str,
    ) -> StorageResult<String> {
        let file = tokio::fs::File::open(path).await?;

        let mut request = self
            .http
            .put(&presign.upload_url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::from(file));

        for (name, value) in &presign.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| StorageError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(status.as_u16(), body));
        }

        match response.headers().get(ETAG) {
            Some(value) => {
                let etag = value
                    .to_str()
                    .unwrap_or_default()
                    .trim_matches('"')
                    .to_string();
                if etag.is_empty() && self.config.strict_etag {
                    return Err(StorageError::MissingEtag(object_key.to_string()));
                }
                Ok(etag)
            }
            None if self.config.strict_etag => {
                Err(StorageError::MissingEtag(object_key.to_string()))
            }
            None => {
                warn!(
                    object_key,
                    "upload response carried no ETag, proceeding in relaxed mode"
                );
                Ok(String::new())
            }
        }
    }

    /// Notify the authority the object landed (one attempt).
    async fn complete(
        &self,
        object_key: &str,
        etag: &str,
        size_bytes: u64,
        content_type: &str,
        public_url: &str,
    ) -> StorageResult<()> {
        let notice = CompleteRequest {
            object_key,
            etag,
            size_bytes,
            content_type,
            public_url,
        };
        let response = self
            .with_auth(self.http.post(self.authority_endpoint("complete")))
            .json(&notice)
            .send()
            .await
            .map_err(|e| StorageError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(status.as_u16(), body));
        }

        Ok(())
    }

    async fn upload_inner(
        &self,
        path: &Path,
        object_key: &str,
        content_type: &str,
    ) -> StorageResult<UploadResult> {
        // Size gate before any network call
        let size_bytes = gate_file_size(path, self.config.max_upload_bytes).await?;

        debug!(object_key, size_bytes, "requesting presigned upload target");
        let presign = with_retry(&self.config.retry, || {
            self.presign(object_key, content_type, size_bytes)
        })
        .await?;

        debug!(object_key, url = %presign.upload_url, "uploading to signed target");
        let etag = with_retry(&self.config.retry, || {
            self.put_object(path, &presign, content_type, size_bytes, object_key)
        })
        .await?;

        self.complete_with_retry(object_key, &etag, size_bytes, content_type, &presign.public_url)
            .await?;

        info!(object_key, size_bytes, etag = %etag, "upload complete");

        Ok(UploadResult {
            object_key: object_key.to_string(),
            public_url: presign.public_url,
            etag,
            size_bytes,
            content_type: content_type.to_string(),
        })
    }

    async fn complete_with_retry(
        &self,
        object_key: &str,
        etag: &str,
        size_bytes: u64,
        content_type: &str,
        public_url: &str,
    ) -> StorageResult<()> {
        with_retry(&self.config.retry, || {
            self.complete(object_key, etag, size_bytes, content_type, public_url)
        })
        .await
    }
}

#[async_trait]
impl StorageProvider for RemoteStorage {
    async fn upload_file(
        &self,
        path: &Path,
        object_key: &str,
        content_type: &str,
        observer: &dyn UploadObserver,
    ) -> StorageResult<UploadResult> {
        observer.upload_started(object_key);

        match self.upload_inner(path, object_key, content_type).await {
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
