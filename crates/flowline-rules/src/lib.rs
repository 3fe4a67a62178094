//! Flowline Rules
//!
//! Event entry point of the engine. A domain event is matched against the
//! active workflow rules for its name, in priority order, and every
//! referenced workflow is handed to the job queue as a `workflowExecutor`
//! job.

pub mod error;
pub mod matcher;
pub mod rule;

pub use error::RuleError;
pub use matcher::{EventOutcome, RuleMatcher, DEFAULT_RULES_COLLECTION};
pub use rule::{WorkflowRef, WorkflowRule};
