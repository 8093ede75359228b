//! Media capability interfaces for the render pipeline.
//!
//! This crate provides:
//! - Capability traits for TTS, slide rendering, and video composition
//! - Stub implementations for tests and local development
//! - Subtitle track derivation from scene narration and timing
//!
//! Concrete engines (TTS vendors, codecs, rasterizers) live behind the
//! traits and are selected once at startup.

pub mod compose;
pub mod error;
pub mod slides;
pub mod subtitle;
pub mod tts;

pub use compose::{ComposeOutput, StubComposer, VideoComposer};
pub use error::{MediaError, MediaResult};
pub use slides::{SlideImage, SlideRenderer, StaticSlideRenderer};
pub use subtitle::{build_cues, render_srt, write_srt, SubtitleCue};
pub use tts::{SceneAudio, StubTts, TtsEngine};
