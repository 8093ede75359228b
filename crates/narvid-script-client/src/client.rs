//! Script authority HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use narvid_models::{RenderSpec, ScriptId, SpecValidationError};

use crate::error::{ScriptClientError, ScriptClientResult};

/// Source of approved render specifications.
///
/// Called exactly once per job, at `start` time. Retries of a job
/// never reach this trait: they run on the snapshot stored at start.
#[async_trait]
pub trait ScriptSnapshotFetcher: Send + Sync {
    /// Fetch and normalize the current approved render spec.
    async fn fetch_render_spec(&self, script_id: &ScriptId) -> ScriptClientResult<RenderSpec>;

    /// Whether an approved script exists, used by job creation.
    async fn has_approved_script(&self, script_id: &ScriptId) -> ScriptClientResult<bool>;
}

/// Configuration for the script authority client.
#[derive(Debug, Clone)]
pub struct ScriptClientConfig {
    /// Base URL of the script authority
    pub base_url: String,
    /// Bearer token for authority calls
    pub api_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Default duration applied to scenes with non-positive durations
    pub default_scene_duration_sec: f64,
}

impl Default for ScriptClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
            default_scene_duration_sec: 8.0,
        }
    }
}

impl ScriptClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SCRIPT_AUTHORITY_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            api_token: std::env::var("SCRIPT_AUTHORITY_TOKEN").ok(),
            timeout: Duration::from_secs(
                std::env::var("SCRIPT_AUTHORITY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            default_scene_duration_sec: std::env::var("DEFAULT_SCENE_DURATION_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8.0),
        }
    }
}

/// HTTP client for the script authority.
pub struct HttpScriptClient {
    http: Client,
    config: ScriptClientConfig,
}

impl HttpScriptClient {
    /// Create a new client.
    pub fn new(config: ScriptClientConfig) -> ScriptClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ScriptClientResult<Self> {
        Self::new(ScriptClientConfig::from_env())
    }

    fn spec_url(&self, script_id: &ScriptId) -> String {
        format!(
            "{}/scripts/{}/render-spec",
            self.config.base_url.trim_end_matches('/'),
            script_id
        )
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn map_error_status(status: StatusCode, script_id: &ScriptId) -> ScriptClientError {
        match status {
            StatusCode::NOT_FOUND => ScriptClientError::NotFound(script_id.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ScriptClientError::Unauthorized(status.as_u16())
            }
            s if s.is_server_error() => ScriptClientError::Upstream(s.as_u16()),
            s => ScriptClientError::UnexpectedStatus(s.as_u16()),
        }
    }
}

#[async_trait]
impl ScriptSnapshotFetcher for HttpScriptClient {
    async fn fetch_render_spec(&self, script_id: &ScriptId) -> ScriptClientResult<RenderSpec> {
        let url = self.spec_url(script_id);
        debug!(script_id = %script_id, "fetching render spec from {}", url);

        let response = self.with_auth(self.http.get(&url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_error_status(status, script_id));
        }

        let spec: RenderSpec = response.json().await?;

        spec.normalize(self.config.default_scene_duration_sec)
            .map_err(|e| match e {
                SpecValidationError::EmptyScenes => {
                    ScriptClientError::EmptySpec(script_id.to_string())
                }
            })
    }

    async fn has_approved_script(&self, script_id: &ScriptId) -> ScriptClientResult<bool> {
        let url = self.spec_url(script_id);

        let response = self.with_auth(self.http.get(&url)).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Err(Self::map_error_status(status, script_id))
    }
}
