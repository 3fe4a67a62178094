//! Logger and notification tasks.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::TaskError;
use crate::registry::Task;
use crate::services::Services;
use crate::steps::NotificationStep;

#[derive(Debug, Deserialize)]
struct LoggerInput {
    #[serde(default)]
    message: Value,
}

/// `logger {message}` -> `{success: true}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerTask;

#[async_trait]
impl Task for LoggerTask {
    fn name(&self) -> &'static str {
        "logger"
    }

    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        let input: LoggerInput = serde_json::from_value(input)?;
        tracing::info!(message = %crate::template::stringify(&input.message), "Logger task");
        Ok(json!({"success": true}))
    }
}

/// `notification {channel, recipient, content}` -> `{success: true}`.
pub struct NotificationTask {
    services: Services,
}

impl NotificationTask {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Task for NotificationTask {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        let step: NotificationStep = serde_json::from_value(input)?;
        step.run(&ExecutionContext::default(), self.services.notifier.as_ref())
            .await?;
        Ok(json!({"success": true}))
    }
}
