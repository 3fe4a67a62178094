//! Flowline Core
//!
//! Shared building blocks for workflow execution.
//!
//! This crate provides:
//! - Typed workflow steps and their handlers
//! - `{{path}}` template resolution against an execution context
//! - Collaborator contracts: document store, HTTP client, notifier, job queue
//! - Task registry with the built-in standalone tasks

pub mod context;
pub mod error;
pub mod http;
pub mod job;
pub mod notify;
pub mod registry;
pub mod result;
pub mod services;
pub mod steps;
pub mod store;
pub mod tasks;
pub mod template;

#[cfg(test)]
mod testing;

pub use context::ExecutionContext;
pub use error::{QueueError, StepError, StoreError, TaskError};
pub use job::{ExecuteWorkflowInput, Job, JobId, JobQueue, RetryConfig, WORKFLOW_EXECUTOR_TASK};
pub use registry::{Task, TaskRegistry};
pub use result::{ExecutionReport, ExecutionStatus, WORKFLOW_NOT_FOUND};
pub use services::Services;
pub use steps::{Step, StepOutcome};
pub use store::{DocumentStore, FindQuery, FindResult};
