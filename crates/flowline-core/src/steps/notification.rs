//! `notification` step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::StepError;
use crate::notify::{Notification, Notifier};

/// Hand a message to the notification collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStep {
    pub channel: String,
    pub recipient: String,
    #[serde(default)]
    pub content: Value,
}

impl NotificationStep {
    /// Resolve channel, recipient and content against the context.
    pub fn build(&self, ctx: &ExecutionContext) -> Notification {
        Notification {
            channel: ctx.resolve_string(&self.channel),
            recipient: ctx.resolve_string(&self.recipient),
            content: ctx.resolve(&self.content),
        }
    }

    pub async fn run(&self, ctx: &ExecutionContext, notifier: &dyn Notifier) -> Result<(), StepError> {
        let notification = self.build(ctx);
        tracing::debug!(
            channel = %notification.channel,
            recipient = %notification.recipient,
            "Sending notification"
        );
        notifier.send(&notification).await
    }
}
