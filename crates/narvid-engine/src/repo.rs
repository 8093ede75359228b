//! Job repository.
//!
//! The repository is the only shared mutable state in the engine.
//! Every transition method is a single critical section over the job
//! record, so the check-and-transition in `try_start`/`try_retry` is
//! a true compare-and-set: two schedulers racing on the same Pending
//! job cannot both launch an executor.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use narvid_models::{ErrorCode, JobId, JobStatus, PipelineStep, RenderJob, RenderSpec, VideoAsset, VideoId};

use crate::error::{EngineError, EngineResult};

/// Outcome of an atomic start attempt.
#[derive(Debug)]
pub enum StartOutcome {
    /// CAS won: snapshot installed, job now Running. The caller must
    /// schedule exactly one executor.
    Started(RenderJob),
    /// Job was not Pending-without-snapshot; current record returned.
    /// Idempotent no-op for the caller, no executor is scheduled.
    AlreadyStarted(RenderJob),
}

/// Outcome of an atomic retry attempt.
#[derive(Debug)]
pub enum RetryOutcome {
    /// CAS won: run state reset, job Running again on the stored
    /// snapshot. The caller must schedule exactly one executor.
    Retrying(RenderJob),
    /// Job is mid-run.
    AlreadyRunning(RenderJob),
    /// Job never installed a snapshot (it never successfully started).
    NoSnapshot(RenderJob),
    /// Accepted no-op: Succeeded or Canceled jobs are not re-run.
    NoOp(RenderJob),
}

/// Outcome of a cancel request.
#[derive(Debug)]
pub enum CancelOutcome {
    /// Pending job canceled immediately.
    Canceled(RenderJob),
    /// Running job flagged; the executor stops at its next step
    /// boundary.
    CancelRequested(RenderJob),
    /// Terminal jobs reject cancellation.
    NotCancelable(RenderJob),
}

/// Durable store of job records.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a freshly created job.
    async fn insert(&self, job: RenderJob) -> EngineResult<()>;

    /// Fetch a job by id.
    async fn get(&self, job_id: &JobId) -> EngineResult<Option<RenderJob>>;

    /// Find the non-terminal job for a video, if any. Enforces the
    /// one-active-job-per-video invariant at creation time.
    async fn find_active_by_video(&self, video_id: &VideoId) -> EngineResult<Option<RenderJob>>;

    /// Atomically install the snapshot and transition Pending -> Running.
    async fn try_start(&self, job_id: &JobId, snapshot: RenderSpec) -> EngineResult<StartOutcome>;

    /// Atomically transition Failed -> Running reusing the stored
    /// snapshot. Never touches the snapshot itself.
    async fn try_retry(&self, job_id: &JobId) -> EngineResult<RetryOutcome>;

    /// Persist step advancement for a running job.
    async fn set_step_progress(
        &self,
        job_id: &JobId,
        step: PipelineStep,
        progress: u8,
    ) -> EngineResult<RenderJob>;

    /// Terminal transition to Succeeded with the result asset.
    async fn mark_succeeded(&self, job_id: &JobId, asset: VideoAsset) -> EngineResult<RenderJob>;

    /// Terminal transition to Failed with a stable code and bounded
    /// message.
    async fn mark_failed(
        &self,
        job_id: &JobId,
        code: ErrorCode,
        message: &str,
        max_message_len: usize,
    ) -> EngineResult<RenderJob>;

    /// Terminal transition to Canceled.
    async fn mark_canceled(&self, job_id: &JobId) -> EngineResult<RenderJob>;

    /// Request cancellation; see [`CancelOutcome`].
    async fn request_cancel(&self, job_id: &JobId) -> EngineResult<CancelOutcome>;

    /// Whether cancellation has been requested for a job.
    async fn is_cancel_requested(&self, job_id: &JobId) -> EngineResult<bool>;
}

/// In-memory repository backed by a single mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<String, RenderJob>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn insert(&self, job: RenderJob) -> EngineResult<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(job.job_id.as_str()) {
            return Err(EngineError::internal(format!(
                "job {} already exists",
                job.job_id
            )));
        }
        jobs.insert(job.job_id.as_str().to_string(), job);
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> EngineResult<Option<RenderJob>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.get(job_id.as_str()).cloned())
    }

    async fn find_active_by_video(&self, video_id: &VideoId) -> EngineResult<Option<RenderJob>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .find(|j| &j.video_id == video_id && !j.status.is_terminal())
            .cloned())
    }

    async fn try_start(&self, job_id: &JobId, snapshot: RenderSpec) -> EngineResult<StartOutcome> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        if job.status == JobStatus::Pending && job.render_spec_snapshot.is_none() {
            job.begin_run(snapshot);
            Ok(StartOutcome::Started(job.clone()))
        } else {
            Ok(StartOutcome::AlreadyStarted(job.clone()))
        }
    }

    async fn try_retry(&self, job_id: &JobId) -> EngineResult<RetryOutcome> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        match job.status {
            JobStatus::Running => Ok(RetryOutcome::AlreadyRunning(job.clone())),
            JobStatus::Pending => Ok(RetryOutcome::NoSnapshot(job.clone())),
            JobStatus::Failed => {
                if job.render_spec_snapshot.is_none() {
                    return Ok(RetryOutcome::NoSnapshot(job.clone()));
                }
                job.begin_retry();
                Ok(RetryOutcome::Retrying(job.clone()))
            }
            JobStatus::Succeeded | JobStatus::Canceled => Ok(RetryOutcome::NoOp(job.clone())),
        }
    }

    async fn set_step_progress(
        &self,
        job_id: &JobId,
        step: PipelineStep,
        progress: u8,
    ) -> EngineResult<RenderJob> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        job.set_step_progress(step, progress);
        Ok(job.clone())
    }

    async fn mark_succeeded(&self, job_id: &JobId, asset: VideoAsset) -> EngineResult<RenderJob> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        job.succeed(asset);
        Ok(job.clone())
    }

    async fn mark_failed(
        &self,
        job_id: &JobId,
        code: ErrorCode,
        message: &str,
        max_message_len: usize,
    ) -> EngineResult<RenderJob> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        job.fail(code, message, max_message_len);
        Ok(job.clone())
    }

    async fn mark_canceled(&self, job_id: &JobId) -> EngineResult<RenderJob> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        job.cancel();
        Ok(job.clone())
    }

    async fn request_cancel(&self, job_id: &JobId) -> EngineResult<CancelOutcome> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;

        match job.status {
            JobStatus::Pending => {
                job.cancel();
                Ok(CancelOutcome::Canceled(job.clone()))
            }
            JobStatus::Running => {
                job.cancel_requested = true;
                Ok(CancelOutcome::CancelRequested(job.clone()))
            }
            _ => Ok(CancelOutcome::NotCancelable(job.clone())),
        }
    }

    async fn is_cancel_requested(&self, job_id: &JobId) -> EngineResult<bool> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .get(job_id.as_str())
            .map(|j| j.cancel_requested)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narvid_models::{Scene, ScriptId};

    fn sample_spec() -> RenderSpec {
        RenderSpec {
            script_id: ScriptId::from_string("s1"),
            video_id: VideoId::from_string("v1"),
            title: "T".to_string(),
            total_duration_sec: 5.0,
            scenes: vec![Scene {
                scene_id: "sc1".to_string(),
                scene_order: 1,
                chapter_title: "C".to_string(),
                purpose: String::new(),
                narration: "n".to_string(),
                caption: String::new(),
                duration_sec: 5.0,
                visual_spec: None,
            }],
        }
    }

    fn new_job() -> RenderJob {
        RenderJob::new(VideoId::from_string("v1"), ScriptId::from_string("s1"))
    }

    #[tokio::test]
    async fn test_try_start_cas_wins_once() {
        let repo = InMemoryJobRepository::new();
        let job = new_job();
        let id = job.job_id.clone();
        repo.insert(job).await.unwrap();

        let first = repo.try_start(&id, sample_spec()).await.unwrap();
        assert!(matches!(first, StartOutcome::Started(_)));

        // Second CAS must lose: the job is no longer Pending
        let second = repo.try_start(&id, sample_spec()).await.unwrap();
        assert!(matches!(second, StartOutcome::AlreadyStarted(_)));
    }

    #[tokio::test]
    async fn test_concurrent_start_launches_exactly_one() {
        let repo = std::sync::Arc::new(InMemoryJobRepository::new());
        let job = new_job();
        let id = job.job_id.clone();
        repo.insert(job).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = std::sync::Arc::clone(&repo);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                repo.try_start(&id, sample_spec()).await.unwrap()
            }));
        }

        let mut started = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), StartOutcome::Started(_)) {
                started += 1;
            }
        }
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn test_retry_requires_failed_with_snapshot() {
        let repo = InMemoryJobRepository::new();
        let job = new_job();
        let id = job.job_id.clone();
        repo.insert(job).await.unwrap();

        // Pending job never started
        assert!(matches!(
            repo.try_retry(&id).await.unwrap(),
            RetryOutcome::NoSnapshot(_)
        ));

        repo.try_start(&id, sample_spec()).await.unwrap();
        assert!(matches!(
            repo.try_retry(&id).await.unwrap(),
            RetryOutcome::AlreadyRunning(_)
        ));

        repo.mark_failed(&id, ErrorCode::GenerateTtsFailed, "boom", 500)
            .await
            .unwrap();
        let outcome = repo.try_retry(&id).await.unwrap();
        let RetryOutcome::Retrying(job) = outcome else {
            panic!("expected Retrying");
        };
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 0);
        assert!(job.render_spec_snapshot.is_some());
    }

    #[tokio::test]
    async fn test_retry_is_noop_on_succeeded_and_canceled() {
        let repo = InMemoryJobRepository::new();
        let job = new_job();
        let id = job.job_id.clone();
        repo.insert(job).await.unwrap();
        repo.try_start(&id, sample_spec()).await.unwrap();
        repo.mark_canceled(&id).await.unwrap();

        assert!(matches!(
            repo.try_retry(&id).await.unwrap(),
            RetryOutcome::NoOp(_)
        ));
    }

    #[tokio::test]
    async fn test_cancel_paths() {
        let repo = InMemoryJobRepository::new();

        // Pending cancels immediately
        let job = new_job();
        let id = job.job_id.clone();
        repo.insert(job).await.unwrap();
        assert!(matches!(
            repo.request_cancel(&id).await.unwrap(),
            CancelOutcome::Canceled(_)
        ));

        // Running is flagged, not yet terminal
        let job2 = RenderJob::new(VideoId::from_string("v2"), ScriptId::from_string("s1"));
        let id2 = job2.job_id.clone();
        repo.insert(job2).await.unwrap();
        repo.try_start(&id2, sample_spec()).await.unwrap();
        assert!(matches!(
            repo.request_cancel(&id2).await.unwrap(),
            CancelOutcome::CancelRequested(_)
        ));
        assert!(repo.is_cancel_requested(&id2).await.unwrap());
        assert_eq!(
            repo.get(&id2).await.unwrap().unwrap().status,
            JobStatus::Running
        );

        // Terminal rejects
        repo.mark_canceled(&id2).await.unwrap();
        assert!(matches!(
            repo.request_cancel(&id2).await.unwrap(),
            CancelOutcome::NotCancelable(_)
        ));
    }

    #[tokio::test]
    async fn test_find_active_by_video_ignores_terminal() {
        let repo = InMemoryJobRepository::new();
        let job = new_job();
        let id = job.job_id.clone();
        let video_id = job.video_id.clone();
        repo.insert(job).await.unwrap();

        assert!(repo.find_active_by_video(&video_id).await.unwrap().is_some());

        repo.request_cancel(&id).await.unwrap();
        assert!(repo.find_active_by_video(&video_id).await.unwrap().is_none());
    }
}
