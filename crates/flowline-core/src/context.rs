//! Execution context threaded through one workflow execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::template;

/// Mutable state of a single workflow execution.
///
/// Holds:
/// - Execution metadata (execution id, workflow id) used for logging
/// - Variables seeded from the job data and extended by step outputs
///
/// A context is created when a job starts and dropped when it ends. It is
/// never shared between executions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Unique execution ID.
    pub execution_id: String,

    /// Workflow being executed.
    pub workflow_id: String,

    /// Variables visible to templates.
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl ExecutionContext {
    /// Create a new, empty execution context.
    pub fn new(execution_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            variables: Map::new(),
        }
    }

    /// Seed variables with a shallow copy of `data`.
    ///
    /// Non-object data leaves the variables empty.
    pub fn with_data(mut self, data: &Value) -> Self {
        if let Value::Object(obj) = data {
            self.variables = obj.clone();
        }
        self
    }

    /// Set a variable value. Existing values are overwritten.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Get a top-level variable.
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Dereference a dotted path (`order.items.0.sku`).
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        template::lookup(&self.variables, path)
    }

    /// Resolve templates in `value` against the current variables.
    pub fn resolve(&self, value: &Value) -> Value {
        template::resolve(value, &self.variables)
    }

    /// Resolve a template string to text.
    pub fn resolve_string(&self, s: &str) -> String {
        template::resolve_string(s, &self.variables)
    }

    /// Variables as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.variables.clone())
    }

    /// Consume the context, returning its variables.
    pub fn into_variables(self) -> Map<String, Value> {
        self.variables
    }
}
