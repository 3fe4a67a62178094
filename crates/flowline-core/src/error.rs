//! Error types for step execution and collaborators.

use thiserror::Error;

/// Errors raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Collection is unknown to the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Record does not exist.
    #[error("Record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    /// Store rejected the request (validation, bad query, bad payload).
    #[error("Store rejected request: {0}")]
    Rejected(String),

    /// Store could not be reached or answered with a server error.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Errors that can occur while running a workflow step.
#[derive(Debug, Error)]
pub enum StepError {
    /// Step configuration is invalid after template resolution.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Document store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Notification delivery error.
    #[error("Notification error: {0}")]
    Notification(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for StepError {
    fn from(e: serde_json::Error) -> Self {
        StepError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for StepError {
    fn from(e: reqwest::Error) -> Self {
        StepError::Http(e.to_string())
    }
}

/// Errors raised when dispatching a named task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task not found in registry.
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Task input could not be decoded.
    #[error("Invalid task input: {0}")]
    InvalidInput(String),

    /// Task body failed.
    #[error("Task failed: {0}")]
    Failed(String),

    /// A step handler invoked by the task failed.
    #[error(transparent)]
    Step(#[from] StepError),
}

impl From<serde_json::Error> for TaskError {
    fn from(e: serde_json::Error) -> Self {
        TaskError::InvalidInput(e.to_string())
    }
}

/// Errors raised by a job queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue is closed and no longer accepts jobs.
    #[error("Queue closed")]
    Closed,

    /// Transport-level failure (connection, publish, ack).
    #[error("Queue transport error: {0}")]
    Transport(String),

    /// Job payload could not be encoded or decoded.
    #[error("Job encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        QueueError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskError::NotFound("logger".to_string());
        assert_eq!(err.to_string(), "Task not found: logger");

        let err = StoreError::RecordNotFound {
            collection: "leads".to_string(),
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "Record not found: leads/42");
    }

    #[test]
    fn test_step_error_from_store() {
        let err: StepError = StoreError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(err, StepError::Store(StoreError::Unavailable(_))));
        assert_eq!(err.to_string(), "Store error: Store unavailable: connection refused");
    }

    #[test]
    fn test_task_error_wraps_step_error_transparently() {
        let err: TaskError = StepError::Http("timeout".to_string()).into();
        assert_eq!(err.to_string(), "HTTP error: timeout");
    }
}
