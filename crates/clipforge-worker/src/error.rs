//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors from pipeline execution.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("job cancelled")]
    Cancelled,

    #[error("job exceeded the {0}s wall clock")]
    Timeout(u64),

    #[error("media error: {0}")]
    Media(#[from] clipforge_media::MediaError),

    #[error("transcription error: {0}")]
    Transcription(#[from] clipforge_asr::AsrError),

    #[error("storage error: {0}")]
    Storage(#[from] clipforge_storage::StorageError),

    #[error("database error: {0}")]
    Database(#[from] clipforge_db::DbError),

    #[error("queue error: {0}")]
    Queue(#[from] clipforge_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Cancellation is an orderly stop, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled)
    }
}
