//! Speech recognition error types.

use std::path::PathBuf;
use thiserror::Error;

pub type AsrResult<T> = Result<T, AsrError>;

/// Errors from the transcription pipeline.
#[derive(Debug, Error)]
pub enum AsrError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("failed to decode audio: {0}")]
    AudioDecode(#[from] hound::Error),

    #[error("unsupported audio format: {0}")]
    UnsupportedAudio(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
