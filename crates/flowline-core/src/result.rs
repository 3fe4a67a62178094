//! Workflow execution result types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Report message when a workflow is missing or not active.
pub const WORKFLOW_NOT_FOUND: &str = "Workflow not found";

/// Terminal status of a workflow execution that ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Every step ran.
    Completed,
    /// A condition step halted the execution.
    Stopped,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of `WorkflowExecutor::execute`.
///
/// Serializes as `{status, context}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionReport {
    Finished {
        status: ExecutionStatus,
        context: Map<String, Value>,
    },
    Failed {
        error: String,
    },
}

impl ExecutionReport {
    pub fn completed(context: Map<String, Value>) -> Self {
        Self::Finished {
            status: ExecutionStatus::Completed,
            context,
        }
    }

    pub fn stopped(context: Map<String, Value>) -> Self {
        Self::Finished {
            status: ExecutionStatus::Stopped,
            context,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Failed {
            error: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::error(WORKFLOW_NOT_FOUND)
    }

    /// Status of a finished execution.
    pub fn status(&self) -> Option<ExecutionStatus> {
        match self {
            Self::Finished { status, .. } => Some(*status),
            Self::Failed { .. } => None,
        }
    }

    /// Final context of a finished execution.
    pub fn context(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Finished { context, .. } => Some(context),
            Self::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Finished { .. } => None,
        }
    }
}
