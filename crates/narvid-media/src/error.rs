//! Media error types.

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

/// Errors from media capability providers.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("TTS synthesis failed: {0}")]
    TtsFailed(String),

    #[error("Slide rendering failed: {0}")]
    SlideFailed(String),

    #[error("Video composition failed: {0}")]
    ComposeFailed(String),

    #[error("Subtitle generation failed: {0}")]
    SubtitleFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn tts_failed(msg: impl Into<String>) -> Self {
        Self::TtsFailed(msg.into())
    }

    pub fn slide_failed(msg: impl Into<String>) -> Self {
        Self::SlideFailed(msg.into())
    }

    pub fn compose_failed(msg: impl Into<String>) -> Self {
        Self::ComposeFailed(msg.into())
    }
}
