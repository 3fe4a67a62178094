//! Record tasks.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::TaskError;
use crate::registry::Task;
use crate::services::Services;
use crate::steps::{FindRecordStep, UpdateRecordStep};

/// `findRecord {collection, query}` -> `{doc, found}`.
pub struct FindRecordTask {
    services: Services,
}

impl FindRecordTask {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Task for FindRecordTask {
    fn name(&self) -> &'static str {
        "findRecord"
    }

    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        let step: FindRecordStep = serde_json::from_value(input)?;
        let doc = step
            .run(&ExecutionContext::default(), self.services.store.as_ref())
            .await?;

        let found = !doc.is_null();
        Ok(json!({"doc": doc, "found": found}))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateRecordInput {
    collection: String,
    id: Value,
    #[serde(default)]
    data: Value,
}

/// `updateRecord {collection, id, data}` -> `{result}`.
pub struct UpdateRecordTask {
    services: Services,
}

impl UpdateRecordTask {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Task for UpdateRecordTask {
    fn name(&self) -> &'static str {
        "updateRecord"
    }

    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        let input: UpdateRecordInput = serde_json::from_value(input)?;
        let step = UpdateRecordStep {
            collection: input.collection,
            record_id: input.id,
            data: input.data,
        };

        let result = step
            .run(&ExecutionContext::default(), self.services.store.as_ref())
            .await?;
        Ok(json!({"result": result}))
    }
}
