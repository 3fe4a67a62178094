//! `transform` step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformOperation {
    /// Resolve `mapping` against the context.
    Map,
    /// Any other operation; a no-op.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStep {
    pub operation: TransformOperation,

    #[serde(default)]
    pub mapping: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl TransformStep {
    /// Produce the step output, or `None` for unsupported operations.
    pub fn apply(&self, ctx: &ExecutionContext) -> Option<Value> {
        match self.operation {
            TransformOperation::Map => Some(ctx.resolve(&self.mapping)),
            TransformOperation::Unsupported => {
                tracing::debug!("Skipping unsupported transform operation");
                None
            }
        }
    }
}
