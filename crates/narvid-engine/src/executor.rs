//! Pipeline executor.
//!
//! Runs the seven render steps strictly in order against one job's
//! frozen snapshot. After every step the new step/progress is
//! persisted and a progress event published before the next step
//! starts. Cancellation is checked at step boundaries only; a step in
//! flight always finishes. Any step error is caught here and converted
//! into a Failed transition — nothing propagates to the spawner.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use narvid_media::{SceneAudio, SlideRenderer, TtsEngine, VideoComposer};
use narvid_models::{
    ErrorCode, JobId, PipelineStep, ProgressUpdate, RenderJob, RenderSpec, VideoAsset,
};
use narvid_storage::{StorageProvider, UploadObserver, UploadResult};

use crate::broadcast::ProgressBroadcaster;
use crate::config::EngineConfig;
use crate::repo::JobRepository;

/// A step failure: the stable code and the message recorded on the job.
type StepError = (ErrorCode, String);

type StepResult<T> = Result<T, StepError>;

/// How a run ended.
enum Completion {
    Succeeded,
    Canceled,
}

/// Executes the render pipeline for one job at a time.
pub struct PipelineExecutor {
    repo: Arc<dyn JobRepository>,
    broadcaster: Arc<ProgressBroadcaster>,
    tts: Arc<dyn TtsEngine>,
    slides: Arc<dyn SlideRenderer>,
    composer: Arc<dyn VideoComposer>,
    storage: Arc<dyn StorageProvider>,
    config: EngineConfig,
}

impl PipelineExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn JobRepository>,
        broadcaster: Arc<ProgressBroadcaster>,
        tts: Arc<dyn TtsEngine>,
        slides: Arc<dyn SlideRenderer>,
        composer: Arc<dyn VideoComposer>,
        storage: Arc<dyn StorageProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repo,
            broadcaster,
            tts,
            slides,
            composer,
            storage,
            config,
        }
    }

    /// Entry point for the spawned background task.
    ///
    /// Never returns an error: every failure ends as a Failed
    /// transition on the job record.
    pub async fn run(&self, job_id: JobId) {
        info!(job_id = %job_id, "render pipeline starting");

        match self.execute(&job_id).await {
            Ok(Completion::Succeeded) => {
                info!(job_id = %job_id, "render pipeline succeeded");
            }
            Ok(Completion::Canceled) => {
                info!(job_id = %job_id, "render pipeline canceled");
            }
            Err((code, message)) => {
                warn!(job_id = %job_id, code = %code, "render pipeline failed: {}", message);
                match self
                    .repo
                    .mark_failed(&job_id, code, &message, self.config.max_error_message_len)
                    .await
                {
                    Ok(job) => {
                        self.broadcaster.finish(&ProgressUpdate::terminal(&job)).await;
                    }
                    Err(e) => {
                        error!(job_id = %job_id, "failed to record pipeline failure: {}", e);
                    }
                }
            }
        }
    }

    async fn execute(&self, job_id: &JobId) -> StepResult<Completion> {
        let job = self
            .repo
            .get(job_id)
            .await
            .map_err(|e| internal_failure(PipelineStep::ValidateScript, e))?
            .ok_or_else(|| {
                (
                    ErrorCode::ValidateScriptFailed,
                    format!("job {} disappeared before execution", job_id),
                )
            })?;

        let spec = job.render_spec_snapshot.clone().ok_or((
            ErrorCode::ValidateScriptFailed,
            "job has no render spec snapshot".to_string(),
        ))?;

        let work_dir = self.config.work_dir.join(job_id.as_str());

        // Step 1: VALIDATE_SCRIPT
        self.enter_step(job_id, PipelineStep::ValidateScript, "validating render spec")
            .await?;
        self.validate(&spec, &work_dir).await?;
        self.complete_step(
            job_id,
            PipelineStep::ValidateScript,
            format!("render spec valid, {} scenes", spec.scenes.len()),
        )
        .await?;
        if self.canceled_at_boundary(job_id, PipelineStep::ValidateScript).await? {
            return self.finish_canceled(job_id, PipelineStep::ValidateScript).await;
        }

        // Step 2: GENERATE_TTS
        self.enter_step(job_id, PipelineStep::GenerateTts, "synthesizing narration")
            .await?;
        let audio = self.generate_tts(&spec, &work_dir).await?;
        let synthesized = audio.iter().filter(|a| a.audio_path.is_some()).count();
        self.complete_step(
            job_id,
            PipelineStep::GenerateTts,
            format!(
                "narration ready: {} synthesized, {} silent",
                synthesized,
                audio.len() - synthesized
            ),
        )
        .await?;
        if self.canceled_at_boundary(job_id, PipelineStep::GenerateTts).await? {
            return self.finish_canceled(job_id, PipelineStep::GenerateTts).await;
        }

        // Step 3: GENERATE_SUBTITLE
        self.enter_step(job_id, PipelineStep::GenerateSubtitle, "deriving subtitles")
            .await?;
        let subtitle_path = work_dir.join("subtitle.srt");
        let cue_count = narvid_media::write_srt(&spec.scenes, &subtitle_path)
            .await
            .map_err(|e| (PipelineStep::GenerateSubtitle.error_code(), e.to_string()))?;
        self.complete_step(
            job_id,
            PipelineStep::GenerateSubtitle,
            format!("subtitle track ready, {} cues", cue_count),
        )
        .await?;
        if self
            .canceled_at_boundary(job_id, PipelineStep::GenerateSubtitle)
            .await?
        {
            return self
                .finish_canceled(job_id, PipelineStep::GenerateSubtitle)
                .await;
        }

        // Step 4: RENDER_SLIDES
        self.enter_step(job_id, PipelineStep::RenderSlides, "rendering slides")
            .await?;
        let slides = self.render_slides(&spec, &work_dir).await?;
        self.complete_step(
            job_id,
            PipelineStep::RenderSlides,
            format!("{} slides rendered", slides.len()),
        )
        .await?;
        if self.canceled_at_boundary(job_id, PipelineStep::RenderSlides).await? {
            return self.finish_canceled(job_id, PipelineStep::RenderSlides).await;
        }

        // Step 5: COMPOSE_VIDEO
        self.enter_step(job_id, PipelineStep::ComposeVideo, "composing video")
            .await?;
        let compose = self
            .composer
            .compose(&slides, &audio, Some(&subtitle_path), &work_dir)
            .await
            .map_err(|e| (PipelineStep::ComposeVideo.error_code(), e.to_string()))?;
        self.complete_step(
            job_id,
            PipelineStep::ComposeVideo,
            format!("video composed, {:.1}s", compose.duration_sec),
        )
        .await?;
        if self.canceled_at_boundary(job_id, PipelineStep::ComposeVideo).await? {
            return self.finish_canceled(job_id, PipelineStep::ComposeVideo).await;
        }

        // Step 6: UPLOAD_ASSETS
        self.enter_step(job_id, PipelineStep::UploadAssets, "uploading assets")
            .await?;
        let asset = self
            .upload_assets(&job, &compose.video_path, &subtitle_path, &compose.thumbnail_path)
            .await
            .map(|(video, subtitle, thumbnail)| VideoAsset {
                video_url: video.public_url,
                subtitle_url: subtitle.public_url,
                thumbnail_url: thumbnail.public_url,
                duration_sec: compose.duration_sec,
            })?;
        self.complete_step(job_id, PipelineStep::UploadAssets, "assets uploaded")
            .await?;
        if self.canceled_at_boundary(job_id, PipelineStep::UploadAssets).await? {
            return self.finish_canceled(job_id, PipelineStep::UploadAssets).await;
        }

        // Step 7: FINALIZE
        self.enter_step(job_id, PipelineStep::Finalize, "finalizing")
            .await?;
        let job = self
            .repo
            .mark_succeeded(job_id, asset)
            .await
            .map_err(|e| internal_failure(PipelineStep::Finalize, e))?;
        self.broadcaster.finish(&ProgressUpdate::terminal(&job)).await;

        Ok(Completion::Succeeded)
    }

    /// Structural re-check of the stored snapshot plus workspace setup.
    async fn validate(&self, spec: &RenderSpec, work_dir: &Path) -> StepResult<()> {
        spec.verify()
            .map_err(|e| (PipelineStep::ValidateScript.error_code(), e.to_string()))?;

        // Duration coercion already ran at snapshot time; a
        // non-positive value here means the snapshot is corrupt.
        if let Some(scene) = spec.scenes.iter().find(|s| s.duration_sec <= 0.0) {
            return Err((
                PipelineStep::ValidateScript.error_code(),
                format!("scene {} has non-positive duration", scene.scene_id),
            ));
        }

        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| (PipelineStep::ValidateScript.error_code(), e.to_string()))?;

        Ok(())
    }

    /// Synthesize narration per scene; silent scenes contribute default
    /// timing, not an error.
    async fn generate_tts(&self, spec: &RenderSpec, work_dir: &Path) -> StepResult<Vec<SceneAudio>> {
        let mut audio = Vec::with_capacity(spec.scenes.len());

        for scene in &spec.scenes {
            if scene.has_narration() {
                let track = self
                    .tts
                    .synthesize(scene, work_dir)
                    .await
                    .map_err(|e| (PipelineStep::GenerateTts.error_code(), e.to_string()))?;
                audio.push(track);
            } else {
                debug!(scene_id = %scene.scene_id, "scene has no narration, skipping TTS");
                audio.push(SceneAudio::silence(scene));
            }
        }

        Ok(audio)
    }

    async fn render_slides(
        &self,
        spec: &RenderSpec,
        work_dir: &Path,
    ) -> StepResult<Vec<narvid_media::SlideImage>> {
        let mut slides = Vec::with_capacity(spec.scenes.len());

        for scene in &spec.scenes {
            let slide = self
                .slides
                .render(scene, work_dir)
                .await
                .map_err(|e| (PipelineStep::RenderSlides.error_code(), e.to_string()))?;
            slides.push(slide);
        }

        Ok(slides)
    }

    /// Upload the three assets under the job's key namespace. Keys are
    /// deterministic per job, so a retry overwrites its own objects
    /// and never collides with other jobs.
    async fn upload_assets(
        &self,
        job: &RenderJob,
        video_path: &Path,
        subtitle_path: &Path,
        thumbnail_path: &Path,
    ) -> StepResult<(UploadResult, UploadResult, UploadResult)> {
        let prefix = format!(
            "videos/{}/{}/{}",
            job.video_id, job.script_id, job.job_id
        );
        let observer = LogUploadObserver;

        let video = self
            .upload_one(video_path, &format!("{}/video.mp4", prefix), "video/mp4", &observer)
            .await?;
        let subtitle = self
            .upload_one(
                subtitle_path,
                &format!("{}/subtitle.srt", prefix),
                "application/x-subrip",
                &observer,
            )
            .await?;
        let thumbnail = self
            .upload_one(
                thumbnail_path,
                &format!("{}/thumbnail.jpg", prefix),
                "image/jpeg",
                &observer,
            )
            .await?;

        Ok((video, subtitle, thumbnail))
    }

    async fn upload_one(
        &self,
        path: &Path,
        object_key: &str,
        content_type: &str,
        observer: &dyn UploadObserver,
    ) -> StepResult<UploadResult> {
        self.storage
            .upload_file(path, object_key, content_type, observer)
            .await
            .map_err(|e| (ErrorCode::StorageUploadFailed, e.to_string()))
    }

    /// Persist step entry and publish, before the step body runs.
    async fn enter_step(
        &self,
        job_id: &JobId,
        step: PipelineStep,
        message: impl Into<String>,
    ) -> StepResult<()> {
        self.persist_and_publish(job_id, step, step.start_progress(), message.into())
            .await
    }

    /// Persist step completion and publish, before the next step starts.
    async fn complete_step(
        &self,
        job_id: &JobId,
        step: PipelineStep,
        message: impl Into<String>,
    ) -> StepResult<()> {
        self.persist_and_publish(job_id, step, step.end_progress(), message.into())
            .await
    }

    async fn persist_and_publish(
        &self,
        job_id: &JobId,
        step: PipelineStep,
        progress: u8,
        message: String,
    ) -> StepResult<()> {
        // Persist first so an observer reading the record never sees
        // an event ahead of durable state.
        self.repo
            .set_step_progress(job_id, step, progress)
            .await
            .map_err(|e| internal_failure(step, e))?;

        self.broadcaster
            .publish(&ProgressUpdate::step(job_id.clone(), step, progress, message))
            .await;

        Ok(())
    }

    /// Step-boundary cancellation check; `after` is the step that just
    /// completed, used to attribute repository failures.
    async fn canceled_at_boundary(&self, job_id: &JobId, after: PipelineStep) -> StepResult<bool> {
        self.repo
            .is_cancel_requested(job_id)
            .await
            .map_err(|e| internal_failure(after, e))
    }

    async fn finish_canceled(&self, job_id: &JobId, after: PipelineStep) -> StepResult<Completion> {
        let job = self
            .repo
            .mark_canceled(job_id)
            .await
            .map_err(|e| internal_failure(after, e))?;
        self.broadcaster.finish(&ProgressUpdate::terminal(&job)).await;
        Ok(Completion::Canceled)
    }
}

fn internal_failure(step: PipelineStep, err: crate::error::EngineError) -> StepError {
    (step.error_code(), err.to_string())
}

/// Logs coarse per-object upload events.
struct LogUploadObserver;

impl UploadObserver for LogUploadObserver {
    fn upload_started(&self, object_key: &str) {
        debug!(object_key, "upload started");
    }

    fn upload_done(&self, object_key: &str, result: &UploadResult) {
        info!(object_key, size_bytes = result.size_bytes, "upload done");
    }

    fn upload_failed(&self, object_key: &str, reason: &str) {
        warn!(object_key, "upload failed: {}", reason);
    }
}
