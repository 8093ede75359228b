//! Video composition capability.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::slides::SlideImage;
use crate::tts::SceneAudio;

/// Output of a composition run.
#[derive(Debug, Clone)]
pub struct ComposeOutput {
    /// Final video file
    pub video_path: PathBuf,
    /// Thumbnail image
    pub thumbnail_path: PathBuf,
    /// Total video duration in seconds
    pub duration_sec: f64,
}

/// Video composer: muxes slides, per-scene audio, and an optional
/// subtitle sidecar into one video plus a thumbnail.
#[async_trait]
pub trait VideoComposer: Send + Sync {
    async fn compose(
        &self,
        slides: &[SlideImage],
        audio: &[SceneAudio],
        subtitle_path: Option<&Path>,
        out_dir: &Path,
    ) -> MediaResult<ComposeOutput>;
}

/// Stub composer for tests and local development.
///
/// Produces placeholder video/thumbnail files; the reported duration
/// is the sum of the scene durations, silent scenes included.
#[derive(Debug, Default, Clone)]
pub struct StubComposer;

#[async_trait]
impl VideoComposer for StubComposer {
    async fn compose(
        &self,
        slides: &[SlideImage],
        audio: &[SceneAudio],
        subtitle_path: Option<&Path>,
        out_dir: &Path,
    ) -> MediaResult<ComposeOutput> {
        if slides.is_empty() {
            return Err(MediaError::compose_failed("no slides to compose"));
        }
        if slides.len() != audio.len() {
            return Err(MediaError::compose_failed(format!(
                "slide/audio count mismatch: {} slides, {} audio tracks",
                slides.len(),
                audio.len()
            )));
        }

        let duration_sec: f64 = audio.iter().map(|a| a.duration_sec).sum();

        let video_path = out_dir.join("video.mp4");
        let thumbnail_path = out_dir.join("thumbnail.jpg");

        let mut manifest = String::new();
        for (slide, track) in slides.iter().zip(audio) {
            manifest.push_str(&format!(
                "{} {} {:.3}\n",
                slide.scene_id,
                track.audio_path.as_deref().map_or("-", |p| p.to_str().unwrap_or("-")),
                track.duration_sec
            ));
        }
        if let Some(sub) = subtitle_path {
            manifest.push_str(&format!("subtitle {}\n", sub.display()));
        }

        debug!(scenes = slides.len(), duration_sec, "stub composer writing video");
        tokio::fs::write(&video_path, manifest.as_bytes()).await?;
        tokio::fs::write(&thumbnail_path, slides[0].scene_id.as_bytes()).await?;

        Ok(ComposeOutput {
            video_path,
            thumbnail_path,
            duration_sec,
        })
    }
}
