//! Engine error types.

use thiserror::Error;

use narvid_models::{ErrorCode, JobId, JobStatus, ScriptId, VideoId};
use narvid_script_client::ScriptClientError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced synchronously from the job service.
///
/// Conflicts leave the job untouched; upstream fetch errors leave the
/// job Pending and the `start` call retryable. Pipeline step failures
/// never appear here: they are recorded on the job record and only
/// observable through status/progress reads.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No approved script exists for {0}")]
    ScriptNotApproved(ScriptId),

    #[error("A non-terminal job {job_id} already exists for video {video_id}")]
    DuplicateJob { video_id: VideoId, job_id: JobId },

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Script not found: {0}")]
    ScriptNotFound(ScriptId),

    #[error("Script authority rejected credentials (status {0})")]
    ScriptFetchUnauthorized(u16),

    #[error("Script fetch failed upstream: {0}")]
    ScriptFetchServerError(String),

    #[error("Render spec for script {0} has no scenes")]
    EmptyRenderSpec(ScriptId),

    #[error("Job {0} has no stored render spec to retry")]
    NoRenderSpecForRetry(JobId),

    #[error("Job {0} is already running")]
    JobAlreadyRunning(JobId),

    #[error("Job {job_id} cannot be canceled from status {status}")]
    CannotCancel { job_id: JobId, status: JobStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable code for callers and job records.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            EngineError::ScriptNotApproved(_) => Some(ErrorCode::ScriptNotApproved),
            EngineError::DuplicateJob { .. } => Some(ErrorCode::DuplicateJob),
            EngineError::JobNotFound(_) => Some(ErrorCode::JobNotFound),
            EngineError::ScriptNotFound(_) => Some(ErrorCode::ScriptNotFound),
            EngineError::ScriptFetchUnauthorized(_) => Some(ErrorCode::ScriptFetchUnauthorized),
            EngineError::ScriptFetchServerError(_) => Some(ErrorCode::ScriptFetchServerError),
            EngineError::EmptyRenderSpec(_) => Some(ErrorCode::EmptyRenderSpec),
            EngineError::NoRenderSpecForRetry(_) => Some(ErrorCode::NoRenderSpecForRetry),
            EngineError::JobAlreadyRunning(_) => Some(ErrorCode::JobAlreadyRunning),
            EngineError::CannotCancel { .. } => Some(ErrorCode::CannotCancel),
            EngineError::Internal(_) => None,
        }
    }

    /// Whether the error is a state conflict rather than a failure.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::DuplicateJob { .. }
                | EngineError::JobAlreadyRunning(_)
                | EngineError::NoRenderSpecForRetry(_)
                | EngineError::CannotCancel { .. }
        )
    }
}

/// Map a snapshot fetch failure onto the caller-facing taxonomy.
pub fn map_fetch_error(script_id: &ScriptId, err: ScriptClientError) -> EngineError {
    match err {
        ScriptClientError::NotFound(_) => EngineError::ScriptNotFound(script_id.clone()),
        ScriptClientError::Unauthorized(status) => EngineError::ScriptFetchUnauthorized(status),
        ScriptClientError::Upstream(status) => {
            EngineError::ScriptFetchServerError(format!("status {}", status))
        }
        ScriptClientError::EmptySpec(_) => EngineError::EmptyRenderSpec(script_id.clone()),
        other => EngineError::ScriptFetchServerError(other.to_string()),
    }
}
