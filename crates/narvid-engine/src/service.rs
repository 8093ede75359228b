//! Render job service.
//!
//! Public operations over the job state machine: create, start, retry,
//! cancel, status, progress subscription. `start` and `retry` schedule
//! exactly one background executor per run; the repository's
//! compare-and-set is the sole concurrency guard, so racing callers
//! cannot double-launch a pipeline.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use narvid_models::{JobId, ProgressUpdate, RenderJob, ScriptId, VideoId};
use narvid_script_client::ScriptSnapshotFetcher;

use crate::broadcast::ProgressBroadcaster;
use crate::error::{map_fetch_error, EngineError, EngineResult};
use crate::executor::PipelineExecutor;
use crate::repo::{CancelOutcome, JobRepository, RetryOutcome, StartOutcome};

/// Service facade owning the render job lifecycle.
pub struct RenderJobService {
    repo: Arc<dyn JobRepository>,
    fetcher: Arc<dyn ScriptSnapshotFetcher>,
    broadcaster: Arc<ProgressBroadcaster>,
    executor: Arc<PipelineExecutor>,
}

impl RenderJobService {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        fetcher: Arc<dyn ScriptSnapshotFetcher>,
        broadcaster: Arc<ProgressBroadcaster>,
        executor: Arc<PipelineExecutor>,
    ) -> Self {
        Self {
            repo,
            fetcher,
            broadcaster,
            executor,
        }
    }

    /// Create a new job in Pending.
    ///
    /// Fails if the script has no approved render spec, or a
    /// non-terminal job already exists for the video.
    pub async fn create(&self, video_id: VideoId, script_id: ScriptId) -> EngineResult<RenderJob> {
        let approved = self
            .fetcher
            .has_approved_script(&script_id)
            .await
            .map_err(|e| map_fetch_error(&script_id, e))?;
        if !approved {
            return Err(EngineError::ScriptNotApproved(script_id));
        }

        if let Some(existing) = self.repo.find_active_by_video(&video_id).await? {
            return Err(EngineError::DuplicateJob {
                video_id,
                job_id: existing.job_id,
            });
        }

        let job = RenderJob::new(video_id, script_id);
        self.repo.insert(job.clone()).await?;

        info!(job_id = %job.job_id, video_id = %job.video_id, "render job created");
        Ok(job)
    }

    /// Start a job: fetch and freeze the snapshot, transition to
    /// Running, schedule the executor.
    ///
    /// Idempotent: a job that already holds a snapshot and is
    /// Running/Succeeded/Failed returns its current state without side
    /// effects, so double-clicks and retried HTTP calls cannot launch
    /// a second pipeline. Fetch failures leave the job Pending and
    /// this call retryable.
    pub async fn start(&self, job_id: &JobId) -> EngineResult<RenderJob> {
        let job = self
            .repo
            .get(job_id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        if job.is_already_started() || job.status.is_terminal() {
            return Ok(job);
        }

        let snapshot = self
            .fetcher
            .fetch_render_spec(&job.script_id)
            .await
            .map_err(|e| map_fetch_error(&job.script_id, e))?;

        match self.repo.try_start(job_id, snapshot).await? {
            StartOutcome::Started(job) => {
                info!(job_id = %job.job_id, "job started, snapshot frozen");
                self.spawn_executor(job.job_id.clone());
                Ok(job)
            }
            // Lost the CAS to a concurrent starter (or a cancel):
            // idempotent no-op.
            StartOutcome::AlreadyStarted(job) => Ok(job),
        }
    }

    /// Retry a failed job on its stored snapshot.
    ///
    /// Never re-fetches the snapshot: both runs render identical
    /// content even if the upstream script changed in between.
    pub async fn retry(&self, job_id: &JobId) -> EngineResult<RenderJob> {
        match self.repo.try_retry(job_id).await? {
            RetryOutcome::Retrying(job) => {
                info!(job_id = %job.job_id, "job retrying on stored snapshot");
                self.spawn_executor(job.job_id.clone());
                Ok(job)
            }
            RetryOutcome::AlreadyRunning(job) => Err(EngineError::JobAlreadyRunning(job.job_id)),
            RetryOutcome::NoSnapshot(_) => Err(EngineError::NoRenderSpecForRetry(job_id.clone())),
            // Succeeded/Canceled: accepted no-op, state unchanged
            RetryOutcome::NoOp(job) => Ok(job),
        }
    }

    /// Cancel a Pending or Running job.
    ///
    /// Pending jobs cancel immediately. Running jobs are flagged and
    /// the executor stops before its next step; in-flight steps are
    /// not interrupted. Terminal jobs reject with a conflict.
    pub async fn cancel(&self, job_id: &JobId) -> EngineResult<RenderJob> {
        match self.repo.request_cancel(job_id).await? {
            CancelOutcome::Canceled(job) => {
                info!(job_id = %job.job_id, "pending job canceled");
                self.broadcaster.finish(&ProgressUpdate::terminal(&job)).await;
                Ok(job)
            }
            CancelOutcome::CancelRequested(job) => {
                info!(job_id = %job.job_id, "cancel requested, stopping at next step boundary");
                Ok(job)
            }
            CancelOutcome::NotCancelable(job) => Err(EngineError::CannotCancel {
                job_id: job.job_id,
                status: job.status,
            }),
        }
    }

    /// Current status/step/progress/error/asset. No side effects.
    pub async fn get_status(&self, job_id: &JobId) -> EngineResult<RenderJob> {
        self.repo
            .get(job_id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))
    }

    /// Subscribe to a job's progress.
    ///
    /// Returns the catch-up event (current state) and a live receiver.
    /// Subscribers joining mid-run get no replayed history.
    pub async fn subscribe_progress(
        &self,
        job_id: &JobId,
    ) -> EngineResult<(ProgressUpdate, broadcast::Receiver<ProgressUpdate>)> {
        let job = self
            .repo
            .get(job_id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        Ok(self.broadcaster.subscribe(&job).await)
    }

    /// Fire-and-forget executor launch; completion is observable only
    /// via status polling or progress subscription.
    fn spawn_executor(&self, job_id: JobId) {
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            executor.run(job_id).await;
        });
    }
}
