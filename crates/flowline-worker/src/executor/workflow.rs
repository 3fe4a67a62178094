//! Workflow executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use flowline_core::{
    ExecutionContext, ExecutionReport, Services, Step, StepError, StepOutcome, StoreError,
};

/// Default collection holding workflows.
pub const DEFAULT_WORKFLOWS_COLLECTION: &str = "workflows";

/// Lifecycle status of a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

/// An ordered list of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub id: Value,

    #[serde(default)]
    pub status: WorkflowStatus,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Errors that abort an execution. All of them are retryable by the queue.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Workflow could not be loaded.
    #[error("Failed to load workflow: {0}")]
    Load(#[from] StoreError),

    /// Workflow document could not be decoded.
    #[error("Invalid workflow {id}: {reason}")]
    InvalidWorkflow { id: String, reason: String },

    /// A step handler failed.
    #[error("Step {index} ({kind}) failed: {source}")]
    Step {
        index: usize,
        kind: &'static str,
        #[source]
        source: StepError,
    },
}

/// Runs one workflow against a fresh context.
#[derive(Debug, Clone)]
pub struct WorkflowExecutor {
    services: Services,
    workflows_collection: String,
}

impl WorkflowExecutor {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            workflows_collection: DEFAULT_WORKFLOWS_COLLECTION.to_string(),
        }
    }

    /// Read workflows from another collection.
    pub fn with_workflows_collection(mut self, collection: impl Into<String>) -> Self {
        self.workflows_collection = collection.into();
        self
    }

    /// Execute `workflow_id` with `data` as the initial context.
    ///
    /// A missing or inactive workflow yields a `Workflow not found` report
    /// without running any step.
    pub async fn execute(
        &self,
        workflow_id: &str,
        data: &Value,
    ) -> Result<ExecutionReport, ExecutorError> {
        let Some(workflow) = self.load(workflow_id).await? else {
            tracing::warn!(workflow_id = %workflow_id, "Workflow not found or not active");
            return Ok(ExecutionReport::not_found());
        };

        let execution_id = uuid::Uuid::new_v4().to_string();
        let mut ctx = ExecutionContext::new(execution_id.as_str(), workflow_id).with_data(data);

        tracing::info!(
            workflow_id = %workflow_id,
            execution_id = %execution_id,
            steps = workflow.steps.len(),
            "Starting workflow execution"
        );

        for (index, step) in workflow.steps.iter().enumerate() {
            tracing::debug!(
                workflow_id = %workflow_id,
                step = index,
                kind = step.kind(),
                "Running step"
            );

            match step.run(&mut ctx, &self.services).await {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Stop) => {
                    tracing::info!(
                        workflow_id = %workflow_id,
                        execution_id = %execution_id,
                        step = index,
                        "Workflow stopped by condition"
                    );
                    return Ok(ExecutionReport::stopped(ctx.into_variables()));
                }
                Err(e) => {
                    tracing::error!(
                        workflow_id = %workflow_id,
                        execution_id = %execution_id,
                        step = index,
                        kind = step.kind(),
                        error = %e,
                        "Step failed"
                    );
                    return Err(ExecutorError::Step {
                        index,
                        kind: step.kind(),
                        source: e,
                    });
                }
            }
        }

        tracing::info!(
            workflow_id = %workflow_id,
            execution_id = %execution_id,
            "Workflow completed"
        );
        Ok(ExecutionReport::completed(ctx.into_variables()))
    }

    /// Fetch an active workflow. Inactive workflows are treated as missing.
    async fn load(&self, workflow_id: &str) -> Result<Option<Workflow>, ExecutorError> {
        let Some(doc) = self
            .services
            .store
            .find_by_id(&self.workflows_collection, workflow_id)
            .await?
        else {
            return Ok(None);
        };

        if doc.get("status").and_then(Value::as_str) != Some("active") {
            return Ok(None);
        }

        serde_json::from_value(doc)
            .map(Some)
            .map_err(|e| ExecutorError::InvalidWorkflow {
                id: workflow_id.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_core::store::InMemoryDocumentStore;
    use flowline_core::ExecutionStatus;
    use serde_json::json;
    use std::sync::Arc;

    async fn executor_with(workflows: Vec<Value>) -> (WorkflowExecutor, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.seed(DEFAULT_WORKFLOWS_COLLECTION, workflows).await;
        (WorkflowExecutor::new(Services::with_store(store.clone())), store)
    }

    #[tokio::test]
    async fn test_missing_and_inactive_workflows() {
        let (executor, store) = executor_with(vec![json!({
            "id": "draft",
            "status": "draft",
            "steps": [{"blockType": "createRecord", "collection": "leads", "data": {}}]
        })])
        .await;

        let report = executor.execute("nope", &json!({})).await.unwrap();
        assert_eq!(report, ExecutionReport::not_found());

        let report = executor.execute("draft", &json!({})).await.unwrap();
        assert_eq!(report.error_message(), Some("Workflow not found"));
        assert_eq!(store.count("leads").await, 0);
    }

    #[tokio::test]
    async fn test_completed_execution_returns_context() {
        let (executor, _) = executor_with(vec![json!({
            "id": "w1",
            "status": "active",
            "steps": [
                {"blockType": "createRecord", "collection": "leads", "data": {"email": "{{email}}"}, "outputKey": "lead"},
                {"blockType": "transform", "operation": "map", "mapping": {"leadEmail": "{{lead.email}}"}, "outputKey": "summary"}
            ]
        })])
        .await;

        let report = executor.execute("w1", &json!({"email": "a@b.com"})).await.unwrap();

        assert_eq!(report.status(), Some(ExecutionStatus::Completed));
        let context = report.context().unwrap();
        assert_eq!(context["email"], json!("a@b.com"));
        assert_eq!(context["lead"]["email"], json!("a@b.com"));
        assert_eq!(context["summary"], json!({"leadEmail": "a@b.com"}));
    }

    #[tokio::test]
    async fn test_stop_skips_remaining_steps() {
        let (executor, store) = executor_with(vec![json!({
            "id": "w1",
            "status": "active",
            "steps": [
                {"blockType": "createRecord", "collection": "audit", "data": {"step": "a"}},
                {"blockType": "condition", "field": "approved", "operator": "equals", "value": true, "actionIfFalse": "stop"},
                {"blockType": "createRecord", "collection": "audit", "data": {"step": "c"}}
            ]
        })])
        .await;

        let report = executor.execute("w1", &json!({"approved": false})).await.unwrap();
        assert_eq!(report.status(), Some(ExecutionStatus::Stopped));
        assert_eq!(store.count("audit").await, 1);

        let report = executor.execute("w1", &json!({"approved": true})).await.unwrap();
        assert_eq!(report.status(), Some(ExecutionStatus::Completed));
        assert_eq!(store.count("audit").await, 3);
    }

    #[tokio::test]
    async fn test_step_failure_aborts_execution() {
        let (executor, store) = executor_with(vec![json!({
            "id": "w1",
            "status": "active",
            "steps": [
                {"blockType": "updateRecord", "collection": "leads", "recordId": "missing", "data": {}},
                {"blockType": "createRecord", "collection": "leads", "data": {}}
            ]
        })])
        .await;

        let err = executor.execute("w1", &json!({})).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Step { index: 0, kind: "updateRecord", .. }));
        assert_eq!(store.count("leads").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_step_kind_is_invalid() {
        let (executor, _) = executor_with(vec![json!({
            "id": "w1",
            "status": "active",
            "steps": [{"blockType": "sendFax", "number": "555"}]
        })])
        .await;

        let err = executor.execute("w1", &json!({})).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidWorkflow { .. }));
    }

    #[tokio::test]
    async fn test_non_object_data_yields_empty_context() {
        let (executor, _) = executor_with(vec![json!({"id": "w1", "status": "active", "steps": []})]).await;

        let report = executor.execute("w1", &json!([1, 2])).await.unwrap();
        assert_eq!(report, ExecutionReport::completed(serde_json::Map::new()));
    }
}
