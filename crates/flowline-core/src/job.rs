//! Job contract shared by producers, queues and workers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::QueueError;

/// Task name of the workflow executor.
pub const WORKFLOW_EXECUTOR_TASK: &str = "workflowExecutor";

/// Identifier assigned by the queue on enqueue.
pub type JobId = uuid::Uuid;

/// A named task invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Task name, looked up in the task registry.
    pub task: String,

    /// Task input.
    #[serde(default)]
    pub input: Value,
}

impl Job {
    pub fn new(task: impl Into<String>, input: Value) -> Self {
        Self {
            task: task.into(),
            input,
        }
    }

    /// Job running `workflow_id` with `data` as its initial context.
    pub fn execute_workflow(workflow_id: impl Into<String>, data: Value) -> Self {
        let workflow_id: String = workflow_id.into();
        Self::new(
            WORKFLOW_EXECUTOR_TASK,
            serde_json::json!({
                "workflowId": workflow_id,
                "data": data,
            }),
        )
    }
}

/// Input of the `workflowExecutor` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteWorkflowInput {
    pub workflow_id: String,
    #[serde(default)]
    pub data: Value,
}

/// Fire-and-forget job submission.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Hand a job to the queue. Delivery is at-least-once; the caller only
    /// learns the assigned id.
    async fn enqueue(&self, job: Job) -> Result<JobId, QueueError>;
}

/// Redelivery policy for failed jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total deliveries before a job is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first redelivery in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between deliveries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Whether a job that just failed on `attempt` (1-based) gets another delivery.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before redelivering a job that failed on `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = if millis.is_finite() {
            millis.min(self.max_delay_ms as f64)
        } else {
            self.max_delay_ms as f64
        };
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_workflow_job_shape() {
        let job = Job::execute_workflow("w1", json!({"email": "a@b.com"}));
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            json!({
                "task": "workflowExecutor",
                "input": {"workflowId": "w1", "data": {"email": "a@b.com"}}
            })
        );

        let input: ExecuteWorkflowInput = serde_json::from_value(job.input).unwrap();
        assert_eq!(input.workflow_id, "w1");
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 10000);
        assert_eq!(config.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_retry_backoff() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_millis(500));
        assert_eq!(config.delay_for(2), Duration::from_millis(1000));
        assert_eq!(config.delay_for(3), Duration::from_millis(2000));
        assert_eq!(config.delay_for(30), Duration::from_millis(10000));

        assert!(config.should_retry(1));
        assert!(config.should_retry(2));
        assert!(!config.should_retry(3));
    }
}
