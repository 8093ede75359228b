//! Engine selfcheck: runs one stub-provider render job end to end
//! against local storage and prints the resulting asset URLs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use narvid_engine::{
    EngineConfig, InMemoryJobRepository, PipelineExecutor, ProgressBroadcaster, RenderJobService,
};
use narvid_media::{StaticSlideRenderer, StubComposer, StubTts};
use narvid_models::{JobStatus, RenderSpec, Scene, ScriptId, VideoId};
use narvid_script_client::{ScriptClientResult, ScriptSnapshotFetcher};
use narvid_storage::{LocalStorage, LocalStorageConfig};

/// Serves one fixed spec; stands in for the script authority.
struct StaticScriptFetcher {
    spec: RenderSpec,
}

#[async_trait]
impl ScriptSnapshotFetcher for StaticScriptFetcher {
    async fn fetch_render_spec(&self, _script_id: &ScriptId) -> ScriptClientResult<RenderSpec> {
        Ok(self.spec.clone())
    }

    async fn has_approved_script(&self, _script_id: &ScriptId) -> ScriptClientResult<bool> {
        Ok(true)
    }
}

fn sample_spec() -> RenderSpec {
    RenderSpec {
        script_id: ScriptId::from_string("selfcheck-script"),
        video_id: VideoId::from_string("selfcheck-video"),
        title: "Selfcheck".to_string(),
        total_duration_sec: 15.0,
        scenes: vec![
            Scene {
                scene_id: "sc1".to_string(),
                scene_order: 1,
                chapter_title: "Hello".to_string(),
                purpose: "hook".to_string(),
                narration: "This is the narrated opening scene.".to_string(),
                caption: "Hello".to_string(),
                duration_sec: 8.0,
                visual_spec: None,
            },
            Scene {
                scene_id: "sc2".to_string(),
                scene_order: 2,
                chapter_title: "Silent".to_string(),
                purpose: String::new(),
                narration: String::new(),
                caption: "A silent scene".to_string(),
                duration_sec: 7.0,
                visual_spec: None,
            },
        ],
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);
    let env_filter = EnvFilter::from_default_env().add_directive("narvid=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    let config = EngineConfig::from_env();
    info!("engine-selfcheck: work_dir={}", config.work_dir.display());

    let repo = Arc::new(InMemoryJobRepository::new());
    let broadcaster = Arc::new(ProgressBroadcaster::new(config.broadcast_capacity));
    let storage = Arc::new(LocalStorage::new(LocalStorageConfig {
        root_dir: config.work_dir.join("store"),
        public_base_url: "http://localhost:8080/assets".to_string(),
        max_upload_bytes: 64 * 1024 * 1024,
    }));
    let executor = Arc::new(PipelineExecutor::new(
        repo.clone(),
        Arc::clone(&broadcaster),
        Arc::new(StubTts),
        Arc::new(StaticSlideRenderer),
        Arc::new(StubComposer),
        storage,
        config,
    ));
    let service = RenderJobService::new(
        repo,
        Arc::new(StaticScriptFetcher { spec: sample_spec() }),
        broadcaster,
        executor,
    );

    let job = service
        .create(
            VideoId::from_string("selfcheck-video"),
            ScriptId::from_string("selfcheck-script"),
        )
        .await?;
    let job = service.start(&job.job_id).await?;
    println!("engine-selfcheck: job {} started", job.job_id);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = service.get_status(&job.job_id).await?;
        if job.status.is_terminal() {
            match job.status {
                JobStatus::Succeeded => {
                    let asset = job.asset.expect("succeeded job carries an asset");
                    println!("engine-selfcheck: ok");
                    println!("  video:     {}", asset.video_url);
                    println!("  subtitle:  {}", asset.subtitle_url);
                    println!("  thumbnail: {}", asset.thumbnail_url);
                    println!("  duration:  {:.1}s", asset.duration_sec);
                    return Ok(());
                }
                other => {
                    anyhow::bail!(
                        "job ended {} ({:?}: {:?})",
                        other,
                        job.error_code,
                        job.error_message
                    );
                }
            }
        }
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("selfcheck timed out waiting for the pipeline");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
