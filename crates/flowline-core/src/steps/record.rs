//! Record steps: create, update, find and delete documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::StepError;
use crate::store::{DocumentStore, FindQuery};
use crate::template;

/// Wrapper key accepted around record `data`: `{"__template__": value}`.
pub const TEMPLATE_WRAPPER_KEY: &str = "__template__";

/// Strip the `__template__` wrapper from already-resolved data.
pub fn unwrap_template(data: Value) -> Value {
    match data {
        Value::Object(mut obj) if obj.contains_key(TEMPLATE_WRAPPER_KEY) => {
            obj.remove(TEMPLATE_WRAPPER_KEY).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn resolve_data(data: &Value, ctx: &ExecutionContext) -> Value {
    unwrap_template(ctx.resolve(data))
}

fn resolve_collection(collection: &str, ctx: &ExecutionContext) -> Result<String, StepError> {
    let name = ctx.resolve_string(collection);
    if name.trim().is_empty() {
        return Err(StepError::Configuration("collection is empty".to_string()));
    }
    Ok(name)
}

fn resolve_record_id(record_id: &Value, ctx: &ExecutionContext) -> Result<String, StepError> {
    let id = match ctx.resolve(record_id) {
        Value::String(s) => s,
        number @ Value::Number(_) => template::stringify(&number),
        other => {
            return Err(StepError::Configuration(format!(
                "recordId must resolve to a string or number, got {}",
                other
            )))
        }
    };

    if id.trim().is_empty() {
        return Err(StepError::Configuration("recordId resolved to an empty value".to_string()));
    }
    Ok(id)
}

/// Create a document; the created document is the step output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordStep {
    pub collection: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl CreateRecordStep {
    pub async fn run(&self, ctx: &ExecutionContext, store: &dyn DocumentStore) -> Result<Value, StepError> {
        let collection = resolve_collection(&self.collection, ctx)?;
        let data = resolve_data(&self.data, ctx);

        tracing::debug!(collection = %collection, "Creating record");
        Ok(store.create(&collection, data).await?)
    }
}

/// Patch a document by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordStep {
    pub collection: String,
    pub record_id: Value,
    #[serde(default)]
    pub data: Value,
}

impl UpdateRecordStep {
    pub async fn run(&self, ctx: &ExecutionContext, store: &dyn DocumentStore) -> Result<Value, StepError> {
        let collection = resolve_collection(&self.collection, ctx)?;
        let id = resolve_record_id(&self.record_id, ctx)?;
        let data = resolve_data(&self.data, ctx);

        tracing::debug!(collection = %collection, id = %id, "Updating record");
        Ok(store.update(&collection, &id, data).await?)
    }
}

/// Find the first document matching `query`; `null` when none matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRecordStep {
    pub collection: String,
    #[serde(default)]
    pub query: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl FindRecordStep {
    pub async fn run(&self, ctx: &ExecutionContext, store: &dyn DocumentStore) -> Result<Value, StepError> {
        let collection = resolve_collection(&self.collection, ctx)?;
        let query = FindQuery::filter(ctx.resolve(&self.query)).with_limit(1);

        tracing::debug!(collection = %collection, "Finding record");
        let result = store.find(&collection, &query).await?;
        Ok(result.docs.into_iter().next().unwrap_or(Value::Null))
    }
}

/// Delete a document by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordStep {
    pub collection: String,
    pub record_id: Value,
}

impl DeleteRecordStep {
    pub async fn run(&self, ctx: &ExecutionContext, store: &dyn DocumentStore) -> Result<(), StepError> {
        let collection = resolve_collection(&self.collection, ctx)?;
        let id = resolve_record_id(&self.record_id, ctx)?;

        tracing::debug!(collection = %collection, id = %id, "Deleting record");
        Ok(store.delete(&collection, &id).await?)
    }
}
