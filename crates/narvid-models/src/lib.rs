//! Shared data models for the Narvid render backend.
//!
//! This crate provides Serde-serializable types for:
//! - Render jobs and their lifecycle state machine
//! - Frozen render specifications (scene lists)
//! - Pipeline steps and progress accounting
//! - Progress events for live subscribers
//! - Stable job-level error codes

pub mod error_code;
pub mod job;
pub mod progress;
pub mod spec;

// Re-export common types
pub use error_code::ErrorCode;
pub use job::{JobId, JobStatus, PipelineStep, RenderJob, ScriptId, VideoAsset, VideoId};
pub use progress::ProgressUpdate;
pub use spec::{RenderSpec, Scene, SpecValidationError};
