//! Progress events for live subscribers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStatus, PipelineStep, RenderJob};

/// Progress snapshot published after each pipeline step and delivered
/// to subscribers. Late subscribers receive one of these as a
/// catch-up event built from the current job record; there is no
/// replayed history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProgressUpdate {
    /// Job ID
    pub job_id: JobId,
    /// Job status at publish time
    pub status: JobStatus,
    /// Step the update refers to (None before the first step)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<PipelineStep>,
    /// Progress (0-100)
    pub progress: u8,
    /// Human-readable message
    pub message: String,
    /// Publish timestamp
    pub timestamp: DateTime<Utc>,
}

impl ProgressUpdate {
    /// Build an update for a step transition.
    pub fn step(job_id: JobId, step: PipelineStep, progress: u8, message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            step: Some(step),
            progress: progress.min(100),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Build the catch-up event for a late subscriber from the job
    /// record's current state.
    pub fn snapshot_of(job: &RenderJob) -> Self {
        let message = match job.status {
            JobStatus::Pending => "waiting to start".to_string(),
            JobStatus::Running => match job.step {
                Some(step) => format!("running {}", step),
                None => "starting".to_string(),
            },
            JobStatus::Succeeded => "render complete".to_string(),
            JobStatus::Failed => job
                .error_message
                .clone()
                .unwrap_or_else(|| "render failed".to_string()),
            JobStatus::Canceled => "render canceled".to_string(),
        };

        Self {
            job_id: job.job_id.clone(),
            status: job.status,
            step: job.step,
            progress: job.progress,
            message,
            timestamp: Utc::now(),
        }
    }

    /// Build the terminal event for a finished job.
    pub fn terminal(job: &RenderJob) -> Self {
        Self::snapshot_of(job)
    }
}
