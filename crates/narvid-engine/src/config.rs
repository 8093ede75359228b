//! Engine configuration.

use std::path::PathBuf;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Work directory for intermediate pipeline artifacts
    pub work_dir: PathBuf,
    /// Duration applied to scenes whose spec carries no positive value
    pub default_scene_duration_sec: f64,
    /// Error messages persisted on failed jobs are truncated to this
    /// many bytes
    pub max_error_message_len: usize,
    /// Buffered events per progress subscriber
    pub broadcast_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/narvid"),
            default_scene_duration_sec: 8.0,
            max_error_message_len: 500,
            broadcast_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("ENGINE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/narvid")),
            default_scene_duration_sec: std::env::var("DEFAULT_SCENE_DURATION_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8.0),
            max_error_message_len: std::env::var("ENGINE_MAX_ERROR_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
            broadcast_capacity: std::env::var("ENGINE_BROADCAST_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
        }
    }
}
