//! Render job definitions and lifecycle state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error_code::ErrorCode;
use crate::spec::RenderSpec;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the video entity a job renders for (owned upstream).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the approved script a job renders from (owned upstream).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScriptId(pub String);

impl ScriptId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render job status.
///
/// Transitions: `Pending -> Running -> {Succeeded, Failed}`,
/// `Pending -> Canceled`, `Running -> Canceled`. The last three are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, not yet started
    #[default]
    Pending,
    /// Pipeline is executing
    Running,
    /// Pipeline finished, asset available
    Succeeded,
    /// Pipeline failed, error recorded
    Failed,
    /// Job canceled before completion
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Cancellation is only valid from Pending or Running.
    pub fn is_cancelable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline step, executed strictly in declaration order.
///
/// Each step owns a contiguous progress sub-range; a run walks the
/// ranges from 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Structural check of the frozen snapshot
    ValidateScript,
    /// Per-scene narration synthesis
    GenerateTts,
    /// Subtitle track derivation
    GenerateSubtitle,
    /// One visual asset per scene
    RenderSlides,
    /// Mux slides + audio + subtitle into one video
    ComposeVideo,
    /// Push video, subtitle, thumbnail to storage
    UploadAssets,
    /// Persist asset URLs and finish
    Finalize,
}

impl PipelineStep {
    /// All steps in execution order.
    pub const ORDER: [PipelineStep; 7] = [
        PipelineStep::ValidateScript,
        PipelineStep::GenerateTts,
        PipelineStep::GenerateSubtitle,
        PipelineStep::RenderSlides,
        PipelineStep::ComposeVideo,
        PipelineStep::UploadAssets,
        PipelineStep::Finalize,
    ];

    /// Progress value published when the step begins.
    pub fn start_progress(&self) -> u8 {
        match self {
            PipelineStep::ValidateScript => 0,
            PipelineStep::GenerateTts => 10,
            PipelineStep::GenerateSubtitle => 30,
            PipelineStep::RenderSlides => 40,
            PipelineStep::ComposeVideo => 60,
            PipelineStep::UploadAssets => 80,
            PipelineStep::Finalize => 95,
        }
    }

    /// Progress value published when the step completes.
    pub fn end_progress(&self) -> u8 {
        match self {
            PipelineStep::ValidateScript => 10,
            PipelineStep::GenerateTts => 30,
            PipelineStep::GenerateSubtitle => 40,
            PipelineStep::RenderSlides => 60,
            PipelineStep::ComposeVideo => 80,
            PipelineStep::UploadAssets => 95,
            PipelineStep::Finalize => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::ValidateScript => "validate_script",
            PipelineStep::GenerateTts => "generate_tts",
            PipelineStep::GenerateSubtitle => "generate_subtitle",
            PipelineStep::RenderSlides => "render_slides",
            PipelineStep::ComposeVideo => "compose_video",
            PipelineStep::UploadAssets => "upload_assets",
            PipelineStep::Finalize => "finalize",
        }
    }

    /// Stable error code recorded when this step fails the job.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PipelineStep::ValidateScript => ErrorCode::ValidateScriptFailed,
            PipelineStep::GenerateTts => ErrorCode::GenerateTtsFailed,
            PipelineStep::GenerateSubtitle => ErrorCode::GenerateSubtitleFailed,
            PipelineStep::RenderSlides => ErrorCode::RenderSlidesFailed,
            PipelineStep::ComposeVideo => ErrorCode::ComposeVideoFailed,
            PipelineStep::UploadAssets => ErrorCode::StorageUploadFailed,
            PipelineStep::Finalize => ErrorCode::FinalizeFailed,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a successful render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoAsset {
    /// Public URL of the rendered video
    pub video_url: String,
    /// Public URL of the subtitle sidecar
    pub subtitle_url: String,
    /// Public URL of the thumbnail
    pub thumbnail_url: String,
    /// Total duration in seconds
    pub duration_sec: f64,
}

/// One tracked attempt (and its retries) to turn a script into a video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    /// Unique job ID
    pub job_id: JobId,

    /// Video this job renders for
    pub video_id: VideoId,

    /// Script this job renders from
    pub script_id: ScriptId,

    /// Lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Current pipeline step (None before the first step)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<PipelineStep>,

    /// Progress (0-100), monotonically non-decreasing within one run
    #[serde(default)]
    pub progress: u8,

    /// Frozen render specification, installed once at start and never
    /// overwritten for the life of the job, retries included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_spec_snapshot: Option<RenderSpec>,

    /// Stable error code (Failed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,

    /// Human-readable error message, truncated for storage (Failed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Result asset (Succeeded only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<VideoAsset>,

    /// Cooperative cancel flag, observed by the executor at step
    /// boundaries.
    #[serde(default)]
    pub cancel_requested: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When the current run started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RenderJob {
    /// Create a new job in Pending.
    pub fn new(video_id: VideoId, script_id: ScriptId) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            script_id,
            status: JobStatus::Pending,
            step: None,
            progress: 0,
            render_spec_snapshot: None,
            error_code: None,
            error_message: None,
            asset: None,
            cancel_requested: false,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Install the frozen snapshot and transition to Running.
    ///
    /// Callers must have verified the job is Pending without a
    /// snapshot; the repository performs this check atomically.
    pub fn begin_run(&mut self, snapshot: RenderSpec) {
        debug_assert!(self.render_spec_snapshot.is_none());
        self.render_spec_snapshot = Some(snapshot);
        self.status = JobStatus::Running;
        self.step = None;
        self.progress = 0;
        self.started_at = Some(Utc::now());
    }

    /// Start a fresh run of the stored snapshot after a failure.
    ///
    /// Progress restarts from 0: a retry is a new run of the same
    /// frozen input.
    pub fn begin_retry(&mut self) {
        debug_assert!(self.render_spec_snapshot.is_some());
        self.status = JobStatus::Running;
        self.step = None;
        self.progress = 0;
        self.error_code = None;
        self.error_message = None;
        self.asset = None;
        self.cancel_requested = false;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
    }

    /// Record step advancement. Progress never moves backwards within
    /// a run.
    pub fn set_step_progress(&mut self, step: PipelineStep, progress: u8) {
        self.step = Some(step);
        self.progress = progress.min(100).max(self.progress);
    }

    /// Mark the job succeeded with its result asset.
    pub fn succeed(&mut self, asset: VideoAsset) {
        self.status = JobStatus::Succeeded;
        self.step = Some(PipelineStep::Finalize);
        self.progress = 100;
        self.asset = Some(asset);
        self.finished_at = Some(Utc::now());
    }

    /// Mark the job failed with a stable code and a bounded message.
    pub fn fail(&mut self, code: ErrorCode, message: impl Into<String>, max_message_len: usize) {
        self.status = JobStatus::Failed;
        self.error_code = Some(code);
        self.error_message = Some(truncate_message(&message.into(), max_message_len));
        self.finished_at = Some(Utc::now());
    }

    /// Mark the job canceled.
    pub fn cancel(&mut self) {
        self.status = JobStatus::Canceled;
        self.finished_at = Some(Utc::now());
    }

    /// Whether a start call on this job is an idempotent no-op.
    pub fn is_already_started(&self) -> bool {
        self.render_spec_snapshot.is_some()
            && matches!(
                self.status,
                JobStatus::Running | JobStatus::Succeeded | JobStatus::Failed
            )
    }
}

/// Truncate a message to at most `max_len` bytes on a char boundary.
pub fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        return msg.to_string();
    }
    let mut end = max_len;
    while end > 0 && !msg.is_char_boundary(end) {
        end -= 1;
    }
    msg[..end].to_string()
}
