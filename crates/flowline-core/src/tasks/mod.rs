//! Standalone tasks a job can invoke directly.
//!
//! - `findRecord` - first document matching a query
//! - `updateRecord` - patch a document by id
//! - `apiCall` - one HTTP request, reports the status code
//! - `notification` - hand a message to the notifier
//! - `logger` - write a message to the log
//!
//! The `workflowExecutor` task lives with the executor in the worker crate.

mod api_call;
mod messaging;
mod records;

pub use self::api_call::ApiCallTask;
pub use self::messaging::{LoggerTask, NotificationTask};
pub use self::records::{FindRecordTask, UpdateRecordTask};

use crate::registry::TaskRegistry;
use crate::services::Services;

/// Create a task registry with all built-in tasks registered.
pub fn create_default_registry(services: &Services) -> TaskRegistry {
    let mut registry = TaskRegistry::new();

    registry.register(FindRecordTask::new(services.clone()));
    registry.register(UpdateRecordTask::new(services.clone()));
    registry.register(ApiCallTask::new(services.clone()));
    registry.register(NotificationTask::new(services.clone()));
    registry.register(LoggerTask);

    registry
}
