//! Flowline Worker
//!
//! Runs workflow jobs pulled from a job queue.
//!
//! This crate provides:
//! - Workflow executor and its `workflowExecutor` task
//! - In-memory and NATS JetStream job queues
//! - NATS event intake feeding the rule matcher
//! - Worker loop with bounded concurrency

pub mod config;
pub mod executor;
pub mod nats;
pub mod queue;
pub mod worker;

pub use config::{QueueBackend, WorkerConfig};
pub use executor::{ExecutorError, WorkflowExecutor, WorkflowExecutorTask};
pub use queue::{InMemoryJobQueue, JobSource, NatsJobQueue};
pub use worker::Worker;
