//! `workflowExecutor` task.

use async_trait::async_trait;
use serde_json::Value;

use flowline_core::{ExecuteWorkflowInput, Task, TaskError, WORKFLOW_EXECUTOR_TASK};

use super::workflow::WorkflowExecutor;

/// Adapts [`WorkflowExecutor`] to the task registry.
pub struct WorkflowExecutorTask {
    executor: WorkflowExecutor,
}

impl WorkflowExecutorTask {
    pub fn new(executor: WorkflowExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Task for WorkflowExecutorTask {
    fn name(&self) -> &'static str {
        WORKFLOW_EXECUTOR_TASK
    }

    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        let input: ExecuteWorkflowInput = serde_json::from_value(input)?;
        let report = self
            .executor
            .execute(&input.workflow_id, &input.data)
            .await
            .map_err(|e| TaskError::Failed(e.to_string()))?;

        Ok(serde_json::to_value(report)?)
    }
}
