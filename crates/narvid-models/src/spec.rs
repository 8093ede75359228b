//! Frozen render specification (the job snapshot).
//!
//! A `RenderSpec` is fetched from the script authority once per job,
//! validated and normalized, then stored on the job record. From that
//! point it is immutable: every run of the job, retries included,
//! renders exactly this content.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::{ScriptId, VideoId};

/// Validation failure for a fetched render specification.
#[derive(Debug, Error, PartialEq)]
pub enum SpecValidationError {
    /// A spec with zero scenes cannot start a job. Distinct from empty
    /// narration, which is valid per-scene.
    #[error("render spec has no scenes")]
    EmptyScenes,
}

/// One narrated unit within a render spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Scene identifier within the script
    pub scene_id: String,

    /// Position within the spec (1-based, sorted on normalization)
    pub scene_order: u32,

    /// Chapter heading shown on the slide
    pub chapter_title: String,

    /// Editorial purpose of the scene
    #[serde(default)]
    pub purpose: String,

    /// Narration text. Empty means "no audio for this scene" — the
    /// TTS step skips it, it is not an error.
    #[serde(default)]
    pub narration: String,

    /// On-screen caption
    #[serde(default)]
    pub caption: String,

    /// Scene duration in seconds. Values <= 0 are coerced to the
    /// configured default during normalization, not rejected.
    #[serde(default)]
    pub duration_sec: f64,

    /// Optional visual layout hints, passed through to the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_spec: Option<serde_json::Value>,
}

impl Scene {
    /// Whether the TTS step should synthesize audio for this scene.
    pub fn has_narration(&self) -> bool {
        !self.narration.trim().is_empty()
    }
}

/// The frozen, validated scene list a job renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSpec {
    /// Script this spec was derived from
    pub script_id: ScriptId,

    /// Video the rendered asset belongs to
    pub video_id: VideoId,

    /// Video title
    pub title: String,

    /// Total duration in seconds (recomputed on normalization when
    /// missing or non-positive)
    #[serde(default)]
    pub total_duration_sec: f64,

    /// Ordered scenes
    pub scenes: Vec<Scene>,
}

impl RenderSpec {
    /// Validate and normalize a freshly fetched spec.
    ///
    /// - rejects zero scenes;
    /// - coerces non-positive scene durations to `default_scene_duration_sec`;
    /// - sorts scenes by `scene_order`;
    /// - recomputes `total_duration_sec` when missing or non-positive.
    pub fn normalize(mut self, default_scene_duration_sec: f64) -> Result<Self, SpecValidationError> {
        if self.scenes.is_empty() {
            return Err(SpecValidationError::EmptyScenes);
        }

        for scene in &mut self.scenes {
            if scene.duration_sec <= 0.0 {
                scene.duration_sec = default_scene_duration_sec;
            }
        }

        self.scenes.sort_by_key(|s| s.scene_order);

        if self.total_duration_sec <= 0.0 {
            self.total_duration_sec = self.scenes.iter().map(|s| s.duration_sec).sum();
        }

        Ok(self)
    }

    /// Structural re-check performed by the pipeline's first step.
    ///
    /// Normalization already ran at snapshot time; this verifies the
    /// stored snapshot still satisfies the invariants.
    pub fn verify(&self) -> Result<(), SpecValidationError> {
        if self.scenes.is_empty() {
            return Err(SpecValidationError::EmptyScenes);
        }
        Ok(())
    }

    /// Sum of scene durations.
    pub fn scene_duration_sum(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_sec).sum()
    }
}
