//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the media toolchain.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolchainUnavailable(&'static str),

    #[error("toolchain command failed: {message}")]
    Toolchain {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid media: {0}")]
    InvalidMedia(String),

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a toolchain failure from a nonzero exit.
    pub fn toolchain(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Toolchain {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Stderr tail captured from the failing process, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Toolchain { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}
