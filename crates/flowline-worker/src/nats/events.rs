//! Subscriber feeding domain events into the rule matcher.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use flowline_rules::{EventOutcome, RuleMatcher};

/// Domain event message published by producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Event name (`form.submitted`).
    pub event: String,

    /// Event payload; becomes the job data.
    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Caller context, stored under `_context` in the job data.
    #[serde(default)]
    pub context: Value,
}

/// Core NATS subscription on the events subject.
///
/// Messages with a reply subject receive the serialized [`EventOutcome`].
pub struct EventIntake {
    client: async_nats::Client,
    subject: String,
    matcher: RuleMatcher,
}

impl EventIntake {
    pub fn new(client: async_nats::Client, subject: impl Into<String>, matcher: RuleMatcher) -> Self {
        Self {
            client,
            subject: subject.into(),
            matcher,
        }
    }

    /// Consume events until the subscription ends.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut subscriber = self.client.subscribe(self.subject.clone()).await?;
        tracing::info!(subject = %self.subject, "Listening for events");

        while let Some(msg) = subscriber.next().await {
            let outcome = match serde_json::from_slice::<EventMessage>(&msg.payload) {
                Ok(message) => self.handle(message).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring malformed event message");
                    continue;
                }
            };

            if let Some(reply) = msg.reply {
                let body = serde_json::to_vec(&outcome)?;
                if let Err(e) = self.client.publish(reply, body.into()).await {
                    tracing::warn!(error = %e, "Failed to reply to event");
                }
            }
        }

        tracing::info!(subject = %self.subject, "Event subscription closed");
        Ok(())
    }

    async fn handle(&self, message: EventMessage) -> EventOutcome {
        tracing::debug!(event = %message.event, "Received event");
        self.matcher
            .process_event(&message.event, message.payload, message.context)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_message_defaults() {
        let message: EventMessage = serde_json::from_value(json!({"event": "user.created"})).unwrap();
        assert_eq!(message.event, "user.created");
        assert!(message.payload.is_empty());
        assert_eq!(message.context, Value::Null);
    }

    #[test]
    fn test_event_message_deserialization() {
        let message: EventMessage = serde_json::from_value(json!({
            "event": "form.submitted",
            "payload": {"email": "a@b.com"},
            "context": {"ip": "1.2.3.4"}
        }))
        .unwrap();
        assert_eq!(message.payload["email"], json!("a@b.com"));
        assert_eq!(message.context["ip"], json!("1.2.3.4"));
    }
}
