//! Notification delivery collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StepError;

/// A resolved notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Delivery channel (`email`, `sms`, `slack`, ...).
    pub channel: String,

    /// Channel-specific recipient address.
    pub recipient: String,

    /// Message content.
    pub content: Value,
}

/// Delivers notifications on behalf of `notification` steps.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), StepError>;
}

/// Notifier that records deliveries in the log and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), StepError> {
        tracing::info!(
            channel = %notification.channel,
            recipient = %notification.recipient,
            content = %notification.content,
            "Notification dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        let notification = Notification {
            channel: "email".to_string(),
            recipient: "a@b.com".to_string(),
            content: json!("Welcome!"),
        };
        assert!(LogNotifier.send(&notification).await.is_ok());
    }
}
