//! Script client error types.

use thiserror::Error;

pub type ScriptClientResult<T> = Result<T, ScriptClientError>;

/// Errors from the script authority.
///
/// Every variant leaves the job Pending and the `start` call
/// retryable; the service maps them onto stable caller-facing codes.
#[derive(Debug, Error)]
pub enum ScriptClientError {
    /// No approved render spec exists for the script (404)
    #[error("No approved render spec for script {0}")]
    NotFound(String),

    /// Authority rejected our credentials (401/403)
    #[error("Script authority rejected credentials with status {0}")]
    Unauthorized(u16),

    /// Authority-side failure (5xx)
    #[error("Script authority error with status {0}")]
    Upstream(u16),

    /// The fetched spec has zero scenes
    #[error("Render spec for script {0} has no scenes")]
    EmptySpec(String),

    /// Unexpected response status
    #[error("Unexpected response from script authority: {0}")]
    UnexpectedStatus(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
