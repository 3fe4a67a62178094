//! Task registry and dispatch.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TaskError;
use crate::job::Job;

/// A named unit of work a job can invoke.
#[async_trait]
pub trait Task: Send + Sync {
    /// Returns the task's unique name.
    fn name(&self) -> &'static str;

    /// Execute the task with its JSON input.
    async fn execute(&self, input: Value) -> Result<Value, TaskError>;
}

/// Registry of available tasks.
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    /// Create a new empty task registry.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Register a task, replacing any task with the same name.
    pub fn register<T: Task + 'static>(&mut self, task: T) {
        let name = task.name().to_string();
        self.tasks.insert(name, Arc::new(task));
    }

    /// Get a task by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }

    /// Check if a task is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// List all registered task names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Execute a task by name.
    pub async fn execute(&self, name: &str, input: Value) -> Result<Value, TaskError> {
        let task = self.get(name).ok_or_else(|| TaskError::NotFound(name.to_string()))?;
        task.execute(input).await
    }

    /// Execute the task a job names.
    pub async fn execute_job(&self, job: Job) -> Result<Value, TaskError> {
        self.execute(&job.task, job.input).await
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTask;

    #[async_trait]
    impl Task for EchoTask {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn execute(&self, input: Value) -> Result<Value, TaskError> {
            Ok(json!({"echo": input}))
        }
    }

    #[test]
    fn test_registry_new() {
        let registry = TaskRegistry::new();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_registry_register() {
        let mut registry = TaskRegistry::new();
        registry.register(EchoTask);

        assert!(registry.has("echo"));
        assert!(!registry.has("unknown"));
        assert_eq!(registry.list(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_registry_execute_job() {
        let mut registry = TaskRegistry::new();
        registry.register(EchoTask);

        let output = registry.execute_job(Job::new("echo", json!(1))).await.unwrap();
        assert_eq!(output, json!({"echo": 1}));
    }

    #[tokio::test]
    async fn test_registry_execute_not_found() {
        let registry = TaskRegistry::new();
        let result = registry.execute("unknown", json!({})).await;
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }
}
