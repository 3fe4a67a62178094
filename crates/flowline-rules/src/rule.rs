//! Workflow rule model.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use flowline_core::template;

/// Maps an event name to the workflows it triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Event name this rule listens to.
    pub event: String,

    /// Extra match conditions. Stored for round-tripping, not evaluated.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub conditions: Value,

    /// Workflows to enqueue, in order.
    #[serde(default)]
    pub workflows: Vec<WorkflowRef>,

    /// Higher priorities are matched first.
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: i64,

    #[serde(default)]
    pub active: bool,

    /// Skip lower-priority rules once this one has been processed.
    #[serde(default)]
    pub stop_on_match: bool,
}

impl WorkflowRule {
    /// Ids of the referenced workflows, in declaration order.
    pub fn workflow_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.workflows.iter().filter_map(WorkflowRef::workflow_id)
    }
}

/// Reference to a workflow: a bare id or a populated document.
///
/// Anything else decodes as [`WorkflowRef::Other`] and is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowRef {
    Id(String),
    Number(i64),
    Document {
        #[serde(default)]
        id: Value,
    },
    Other(Value),
}

impl WorkflowRef {
    pub fn workflow_id(&self) -> Option<String> {
        match self {
            WorkflowRef::Id(id) => Some(id.clone()).filter(|id| !id.is_empty()),
            WorkflowRef::Number(id) => Some(id.to_string()),
            WorkflowRef::Document { id } => match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                number @ Value::Number(_) => Some(template::stringify(number)),
                _ => None,
            },
            WorkflowRef::Other(_) => None,
        }
    }
}

/// Accept integers, integral floats and null (as 0).
fn lenient_priority<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid priority: {}", n))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid priority: {}",
            other
        ))),
    }
}
