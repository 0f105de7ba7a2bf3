//! Task Error Types

use thiserror::Error;

/// Result type for scheduled tasks
pub type TaskResult<T> = Result<T, TaskError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// The task observed cancellation, or was cancelled before it started
    #[error("Task was cancelled")]
    Cancelled,

    /// The task reported a failure
    #[error("Task failed: {message}")]
    Failed { message: String },

    /// The task panicked
    #[error("Task panicked: {message}")]
    Panicked { message: String },

    /// The scheduler shut down before the task could run
    #[error("Scheduler is closed")]
    SchedulerClosed,
}

impl TaskError {
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<tokio::task::JoinError> for TaskError {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_cancelled() {
            return Self::Cancelled;
        }
        let payload = error.into_panic();
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            text.to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked { message }
    }
}
