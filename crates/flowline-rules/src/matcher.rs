//! Event to workflow-job matching.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use flowline_core::{DocumentStore, FindQuery, Job, JobId, JobQueue};

use crate::error::RuleError;
use crate::rule::WorkflowRule;

/// Default collection holding workflow rules.
pub const DEFAULT_RULES_COLLECTION: &str = "workflow-rules";

/// Key under which the caller context is merged into job data.
const CONTEXT_KEY: &str = "_context";

/// Result of [`RuleMatcher::process_event`].
///
/// Serializes as `{success: true, message, jobIds}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventOutcome {
    Triggered {
        success: bool,
        message: String,
        #[serde(rename = "jobIds")]
        job_ids: Vec<JobId>,
    },
    Failed {
        success: bool,
        error: String,
    },
}

impl EventOutcome {
    fn triggered(message: String, job_ids: Vec<JobId>) -> Self {
        Self::Triggered {
            success: true,
            message,
            job_ids,
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self::Failed {
            success: false,
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Triggered { .. })
    }

    /// Ids of the enqueued jobs, empty on failure.
    pub fn job_ids(&self) -> &[JobId] {
        match self {
            Self::Triggered { job_ids, .. } => job_ids,
            Self::Failed { .. } => &[],
        }
    }
}

/// Matches events against active rules and enqueues executor jobs.
#[derive(Clone)]
pub struct RuleMatcher {
    store: Arc<dyn DocumentStore>,
    queue: Arc<dyn JobQueue>,
    rules_collection: String,
}

impl RuleMatcher {
    pub fn new(store: Arc<dyn DocumentStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            store,
            queue,
            rules_collection: DEFAULT_RULES_COLLECTION.to_string(),
        }
    }

    /// Read rules from another collection.
    pub fn with_rules_collection(mut self, collection: impl Into<String>) -> Self {
        self.rules_collection = collection.into();
        self
    }

    /// Match `event` and enqueue one job per referenced workflow.
    ///
    /// Failures are reported in the outcome; this never errors.
    pub async fn process_event(
        &self,
        event: &str,
        payload: Map<String, Value>,
        context: Value,
    ) -> EventOutcome {
        match self.try_process_event(event, payload, context).await {
            Ok((0, _)) => EventOutcome::triggered(
                format!("No matching rules for event '{}'", event),
                Vec::new(),
            ),
            Ok((_, job_ids)) => {
                let message = format!(
                    "Triggered {} workflow job(s) for event '{}'",
                    job_ids.len(),
                    event
                );
                EventOutcome::triggered(message, job_ids)
            }
            Err(e) => {
                tracing::error!(event = %event, error = %e, "Failed to process event");
                EventOutcome::failed(e)
            }
        }
    }

    /// Returns the number of matched rules and the enqueued job ids.
    async fn try_process_event(
        &self,
        event: &str,
        payload: Map<String, Value>,
        context: Value,
    ) -> Result<(usize, Vec<JobId>), RuleError> {
        if event.trim().is_empty() {
            return Err(RuleError::MissingEvent);
        }

        let rules = self.find_rules(event).await?;
        if rules.is_empty() {
            tracing::debug!(event = %event, "No matching rules");
            return Ok((0, Vec::new()));
        }

        let mut data = payload;
        data.insert(CONTEXT_KEY.to_string(), context);
        let data = Value::Object(data);

        let mut job_ids = Vec::new();
        let mut matched = 0;

        for rule in &rules {
            matched += 1;

            for workflow_id in rule.workflow_ids() {
                let job_id = self
                    .queue
                    .enqueue(Job::execute_workflow(workflow_id.as_str(), data.clone()))
                    .await?;

                tracing::info!(
                    event = %event,
                    workflow_id = %workflow_id,
                    job_id = %job_id,
                    priority = rule.priority,
                    "Enqueued workflow job"
                );
                job_ids.push(job_id);
            }

            if rule.stop_on_match {
                tracing::debug!(event = %event, priority = rule.priority, "Rule stops matching");
                break;
            }
        }

        Ok((matched, job_ids))
    }

    /// Active rules for `event`, highest priority first.
    async fn find_rules(&self, event: &str) -> Result<Vec<WorkflowRule>, RuleError> {
        let query = FindQuery::filter(json!({
            "event": {"equals": event},
            "active": {"equals": true}
        }))
        .with_sort("-priority");

        let result = self.store.find(&self.rules_collection, &query).await?;
        result
            .docs
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(RuleError::from))
            .collect()
    }
}

impl std::fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleMatcher")
            .field("rules_collection", &self.rules_collection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flowline_core::store::InMemoryDocumentStore;
    use flowline_core::{QueueError, StoreError, WORKFLOW_EXECUTOR_TASK};
    use std::sync::Mutex;

    /// Queue that records jobs instead of running them.
    #[derive(Default)]
    struct RecordingQueue {
        jobs: Mutex<Vec<Job>>,
        closed: bool,
    }

    impl RecordingQueue {
        fn workflow_ids(&self) -> Vec<String> {
            self.jobs
                .lock()
                .unwrap()
                .iter()
                .map(|job| job.input["workflowId"].as_str().unwrap().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl JobQueue for RecordingQueue {
        async fn enqueue(&self, job: Job) -> Result<JobId, QueueError> {
            if self.closed {
                return Err(QueueError::Closed);
            }
            self.jobs.lock().unwrap().push(job);
            Ok(JobId::new_v4())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn find(
            &self,
            _collection: &str,
            _query: &FindQuery,
        ) -> Result<flowline_core::FindResult, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn find_by_id(&self, _collection: &str, _id: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn create(&self, _collection: &str, _doc: Value) -> Result<Value, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn update(&self, _collection: &str, _id: &str, _data: Value) -> Result<Value, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn delete(&self, _collection: &str, _id: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    async fn matcher_with(rules: Vec<Value>) -> (RuleMatcher, Arc<RecordingQueue>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.seed(DEFAULT_RULES_COLLECTION, rules).await;
        let queue = Arc::new(RecordingQueue::default());
        (RuleMatcher::new(store, queue.clone()), queue)
    }

    #[tokio::test]
    async fn test_enqueues_one_job_per_workflow_in_priority_order() {
        let (matcher, queue) = matcher_with(vec![
            json!({"event": "form.submitted", "workflows": ["low"], "priority": 1, "active": true}),
            json!({"event": "form.submitted", "workflows": ["high-a", "high-b"], "priority": 10, "active": true}),
            json!({"event": "form.submitted", "workflows": ["inactive"], "priority": 99, "active": false}),
            json!({"event": "other", "workflows": ["other"], "priority": 50, "active": true}),
        ])
        .await;

        let outcome = matcher
            .process_event("form.submitted", payload(json!({"email": "a@b.com"})), json!({"ip": "1.2.3.4"}))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.job_ids().len(), 3);
        assert_eq!(queue.workflow_ids(), vec!["high-a", "high-b", "low"]);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], json!(true));
        assert_eq!(json["message"], json!("Triggered 3 workflow job(s) for event 'form.submitted'"));
        assert_eq!(json["jobIds"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_ref_without_id_does_not_block_other_rules() {
        let (matcher, queue) = matcher_with(vec![
            json!({"event": "form.submitted", "workflows": ["first"], "priority": 10, "active": true}),
            json!({
                "event": "form.submitted",
                "workflows": [{"title": "populated without id"}, "second"],
                "priority": 5,
                "active": true
            }),
        ])
        .await;

        let outcome = matcher
            .process_event("form.submitted", payload(json!({})), Value::Null)
            .await;

        assert!(outcome.is_success());
        assert_eq!(queue.workflow_ids(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_job_carries_payload_and_context() {
        let (matcher, queue) = matcher_with(vec![json!({
            "event": "form.submitted",
            "workflows": [{"id": "w1", "steps": []}],
            "priority": 0,
            "active": true
        })])
        .await;

        matcher
            .process_event(
                "form.submitted",
                payload(json!({"email": "a@b.com", "_context": "overwritten"})),
                json!({"source": "landing"}),
            )
            .await;

        let jobs = queue.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].task, WORKFLOW_EXECUTOR_TASK);
        assert_eq!(
            jobs[0].input,
            json!({
                "workflowId": "w1",
                "data": {"email": "a@b.com", "_context": {"source": "landing"}}
            })
        );
    }

    #[tokio::test]
    async fn test_stop_on_match_skips_lower_priorities() {
        let (matcher, queue) = matcher_with(vec![
            json!({"event": "e", "workflows": ["a"], "priority": 5, "active": true, "stopOnMatch": true}),
            json!({"event": "e", "workflows": ["b"], "priority": 1, "active": true}),
        ])
        .await;

        let outcome = matcher.process_event("e", Map::new(), Value::Null).await;

        assert_eq!(outcome.job_ids().len(), 1);
        assert_eq!(queue.workflow_ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_no_matching_rules() {
        let (matcher, queue) = matcher_with(vec![]).await;

        let outcome = matcher.process_event("user.created", Map::new(), Value::Null).await;

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": true, "message": "No matching rules for event 'user.created'", "jobIds": []})
        );
        assert!(queue.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_event_is_rejected() {
        let (matcher, _) = matcher_with(vec![]).await;

        let outcome = matcher.process_event("  ", Map::new(), Value::Null).await;

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": false, "error": "Event name is required"})
        );
    }

    #[tokio::test]
    async fn test_store_failure_becomes_failed_outcome() {
        let matcher = RuleMatcher::new(Arc::new(FailingStore), Arc::new(RecordingQueue::default()));

        let outcome = matcher.process_event("e", Map::new(), Value::Null).await;

        assert!(!outcome.is_success());
        assert!(outcome.job_ids().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_rule_and_closed_queue_fail() {
        let (matcher, _) = matcher_with(vec![
            json!({"event": "e", "workflows": ["a"], "priority": "urgent", "active": true}),
        ])
        .await;
        assert!(!matcher.process_event("e", Map::new(), Value::Null).await.is_success());

        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .seed("rules", [json!({"event": "e", "workflows": ["a"], "active": true})])
            .await;
        let queue = Arc::new(RecordingQueue {
            closed: true,
            ..Default::default()
        });
        let matcher = RuleMatcher::new(store, queue).with_rules_collection("rules");

        let outcome = matcher.process_event("e", Map::new(), Value::Null).await;
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": false, "error": "Failed to enqueue job: Queue closed"})
        );
    }
}
