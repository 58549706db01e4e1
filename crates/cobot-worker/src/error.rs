//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job queue is full ({capacity} jobs waiting)")]
    QueueFull { capacity: usize },

    #[error("Executor is shutting down")]
    ShuttingDown,

    #[error("Media error: {0}")]
    Media(#[from] cobot_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Check if the submission was refused because of backpressure.
    pub fn is_backpressure(&self) -> bool {
        matches!(self, WorkerError::QueueFull { .. } | WorkerError::ShuttingDown)
    }
}
