//! Slide rendering capability.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use narvid_models::Scene;

use crate::error::MediaResult;

/// Rendered visual asset for one scene.
#[derive(Debug, Clone)]
pub struct SlideImage {
    /// Scene this slide belongs to
    pub scene_id: String,
    /// Path of the rendered image
    pub image_path: PathBuf,
    /// How long the slide is shown, in seconds
    pub duration_sec: f64,
}

/// Slide/image renderer.
#[async_trait]
pub trait SlideRenderer: Send + Sync {
    /// Rasterize one visual asset for the scene into `out_dir`.
    async fn render(&self, scene: &Scene, out_dir: &Path) -> MediaResult<SlideImage>;
}

/// Stub renderer for tests and local development. Writes a
/// placeholder image file per scene.
#[derive(Debug, Default, Clone)]
pub struct StaticSlideRenderer;

#[async_trait]
impl SlideRenderer for StaticSlideRenderer {
    async fn render(&self, scene: &Scene, out_dir: &Path) -> MediaResult<SlideImage> {
        let path = out_dir.join(format!("{}.png", scene.scene_id));
        debug!(scene_id = %scene.scene_id, "stub slide writing {}", path.display());

        let placeholder = format!("{}\n{}", scene.chapter_title, scene.caption);
        tokio::fs::write(&path, placeholder.as_bytes()).await?;

        Ok(SlideImage {
            scene_id: scene.scene_id.clone(),
            image_path: path,
            duration_sec: scene.duration_sec,
        })
    }
}
