//! Workflow execution.

mod task;
mod workflow;

pub use task::WorkflowExecutorTask;
pub use workflow::{
    ExecutorError, Workflow, WorkflowExecutor, WorkflowStatus, DEFAULT_WORKFLOWS_COLLECTION,
};
