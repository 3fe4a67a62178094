//! Rule matching errors.

use flowline_core::{QueueError, StoreError};
use thiserror::Error;

/// Failures while matching an event. Never escapes `process_event`.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Event name is empty.
    #[error("Event name is required")]
    MissingEvent,

    /// Rule lookup failed.
    #[error("Rule lookup failed: {0}")]
    Lookup(#[from] StoreError),

    /// A rule document could not be decoded.
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// A job could not be enqueued.
    #[error("Failed to enqueue job: {0}")]
    Enqueue(#[from] QueueError),
}

impl From<serde_json::Error> for RuleError {
    fn from(e: serde_json::Error) -> Self {
        RuleError::InvalidRule(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(RuleError::MissingEvent.to_string(), "Event name is required");
        assert_eq!(
            RuleError::from(StoreError::Unavailable("timeout".to_string())).to_string(),
            "Rule lookup failed: Store unavailable: timeout"
        );
        assert_eq!(
            RuleError::from(QueueError::Closed).to_string(),
            "Failed to enqueue job: Queue closed"
        );
    }
}
