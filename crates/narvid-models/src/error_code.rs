//! Stable job-level error codes.
//!
//! These identifiers are persisted on failed jobs and surfaced to
//! callers; they must stay stable across releases.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error code for job conflicts, upstream fetch failures, and
/// pipeline step failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input/state conflicts (synchronous, job state unchanged)
    ScriptNotApproved,
    DuplicateJob,
    JobNotFound,
    JobAlreadyRunning,
    NoRenderSpecForRetry,
    CannotCancel,

    // Upstream snapshot fetch failures (job stays Pending)
    ScriptNotFound,
    ScriptFetchUnauthorized,
    ScriptFetchServerError,
    EmptyRenderSpec,

    // Pipeline step failures (recorded on the job)
    ValidateScriptFailed,
    GenerateTtsFailed,
    GenerateSubtitleFailed,
    RenderSlidesFailed,
    ComposeVideoFailed,
    StorageUploadFailed,
    FinalizeFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ScriptNotApproved => "SCRIPT_NOT_APPROVED",
            ErrorCode::DuplicateJob => "DUPLICATE_JOB",
            ErrorCode::JobNotFound => "JOB_NOT_FOUND",
            ErrorCode::JobAlreadyRunning => "JOB_ALREADY_RUNNING",
            ErrorCode::NoRenderSpecForRetry => "NO_RENDER_SPEC_FOR_RETRY",
            ErrorCode::CannotCancel => "CANNOT_CANCEL",
            ErrorCode::ScriptNotFound => "SCRIPT_NOT_FOUND",
            ErrorCode::ScriptFetchUnauthorized => "SCRIPT_FETCH_UNAUTHORIZED",
            ErrorCode::ScriptFetchServerError => "SCRIPT_FETCH_SERVER_ERROR",
            ErrorCode::EmptyRenderSpec => "EMPTY_RENDER_SPEC",
            ErrorCode::ValidateScriptFailed => "VALIDATE_SCRIPT_FAILED",
            ErrorCode::GenerateTtsFailed => "GENERATE_TTS_FAILED",
            ErrorCode::GenerateSubtitleFailed => "GENERATE_SUBTITLE_FAILED",
            ErrorCode::RenderSlidesFailed => "RENDER_SLIDES_FAILED",
            ErrorCode::ComposeVideoFailed => "COMPOSE_VIDEO_FAILED",
            ErrorCode::StorageUploadFailed => "STORAGE_UPLOAD_FAILED",
            ErrorCode::FinalizeFailed => "FINALIZE_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
