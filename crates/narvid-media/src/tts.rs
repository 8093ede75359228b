//! Text-to-speech capability.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use narvid_models::Scene;

use crate::error::MediaResult;

/// Synthesized narration for one scene.
#[derive(Debug, Clone)]
pub struct SceneAudio {
    /// Scene this audio belongs to
    pub scene_id: String,
    /// Path of the synthesized audio file. None means the scene is
    /// silent and contributes only its configured duration.
    pub audio_path: Option<PathBuf>,
    /// Audio duration in seconds
    pub duration_sec: f64,
}

impl SceneAudio {
    /// A silent entry for a scene with no narration.
    pub fn silence(scene: &Scene) -> Self {
        Self {
            scene_id: scene.scene_id.clone(),
            audio_path: None,
            duration_sec: scene.duration_sec,
        }
    }
}

/// Text-to-speech engine.
///
/// Callers only invoke this for scenes with non-empty narration;
/// silent scenes never reach the engine.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Synthesize narration audio for one scene into `out_dir`.
    async fn synthesize(&self, scene: &Scene, out_dir: &Path) -> MediaResult<SceneAudio>;
}

/// Stub engine for tests and local development.
///
/// Writes a placeholder audio file and reports the scene's configured
/// duration.
#[derive(Debug, Default, Clone)]
pub struct StubTts;

#[async_trait]
impl TtsEngine for StubTts {
    async fn synthesize(&self, scene: &Scene, out_dir: &Path) -> MediaResult<SceneAudio> {
        let path = out_dir.join(format!("{}.wav", scene.scene_id));
        debug!(scene_id = %scene.scene_id, "stub tts writing {}", path.display());

        tokio::fs::write(&path, scene.narration.as_bytes()).await?;

        Ok(SceneAudio {
            scene_id: scene.scene_id.clone(),
            audio_path: Some(path),
            duration_sec: scene.duration_sec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(narration: &str, duration: f64) -> Scene {
        Scene {
            scene_id: "sc1".to_string(),
            scene_order: 1,
            chapter_title: "Intro".to_string(),
            purpose: String::new(),
            narration: narration.to_string(),
            caption: String::new(),
            duration_sec: duration,
            visual_spec: None,
        }
    }

    #[tokio::test]
    async fn test_stub_tts_writes_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let audio = StubTts.synthesize(&scene("hello", 6.0), dir.path()).await.unwrap();

        assert!(audio.audio_path.as_ref().unwrap().exists());
        assert_eq!(audio.duration_sec, 6.0);
    }

    #[test]
    fn test_silence_entry_has_no_path() {
        let audio = SceneAudio::silence(&scene("", 4.0));
        assert!(audio.audio_path.is_none());
        assert_eq!(audio.duration_sec, 4.0);
    }
}
