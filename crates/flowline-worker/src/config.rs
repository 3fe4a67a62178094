//! Worker configuration.

use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

use flowline_core::RetryConfig;

/// Job queue backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueBackend {
    /// Process-local queue; jobs are lost on exit.
    #[default]
    Memory,
    /// NATS JetStream stream with a durable pull consumer.
    Nats,
}

impl FromStr for QueueBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Ok(QueueBackend::Memory),
            "nats" => Ok(QueueBackend::Nats),
            other => bail!("unknown queue backend '{}' (expected memory or nats)", other),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Unique worker identifier (UUID).
    pub worker_id: String,

    /// Job queue backend.
    pub queue: QueueBackend,

    /// NATS server URL.
    pub nats_url: String,

    /// NATS stream name.
    pub nats_stream: String,

    /// NATS consumer name.
    pub nats_consumer: String,

    /// Subject carrying domain events.
    pub events_subject: String,

    /// Document store base URL. `None` uses the in-memory store.
    pub store_url: Option<String>,

    /// Document store API key.
    pub store_api_key: Option<String>,

    /// Collection holding workflow rules.
    pub rules_collection: String,

    /// Collection holding workflows.
    pub workflows_collection: String,

    /// Timeout for outbound HTTP calls.
    pub http_timeout: Duration,

    /// Maximum concurrent jobs.
    pub max_concurrent_jobs: usize,

    /// Job redelivery policy.
    pub retry: RetryConfig,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value for {}: '{}'", name, raw)),
        None => Ok(default),
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let worker_id = env_or("WORKER_ID", &defaults.worker_id);
        let queue = env_parse("FLOWLINE_QUEUE", defaults.queue)?;

        let max_concurrent: usize = env_parse("WORKER_MAX_CONCURRENT", defaults.max_concurrent_jobs)?;
        if max_concurrent == 0 {
            bail!("WORKER_MAX_CONCURRENT must be at least 1");
        }

        let max_attempts: u32 = env_parse("JOB_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            bail!("JOB_MAX_ATTEMPTS must be at least 1");
        }

        let http_timeout_secs: u64 = env_parse("HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs())?;

        Ok(Self {
            worker_id,
            queue,
            nats_url: env_or("NATS_URL", &defaults.nats_url),
            nats_stream: env_or("NATS_STREAM", &defaults.nats_stream),
            nats_consumer: env_or("NATS_CONSUMER", &defaults.nats_consumer),
            events_subject: env_or("NATS_EVENTS_SUBJECT", &defaults.events_subject),
            store_url: env_opt("STORE_URL"),
            store_api_key: env_opt("STORE_API_KEY"),
            rules_collection: env_or("RULES_COLLECTION", &defaults.rules_collection),
            workflows_collection: env_or("WORKFLOWS_COLLECTION", &defaults.workflows_collection),
            http_timeout: Duration::from_secs(http_timeout_secs),
            max_concurrent_jobs: max_concurrent,
            retry: defaults.retry.with_max_attempts(max_attempts),
        })
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: uuid::Uuid::new_v4().to_string(),
            queue: QueueBackend::Memory,
            nats_url: "nats://localhost:4222".to_string(),
            nats_stream: "flowline_jobs".to_string(),
            nats_consumer: "flowline-worker".to_string(),
            events_subject: "flowline.events".to_string(),
            store_url: None,
            store_api_key: None,
            rules_collection: flowline_rules::DEFAULT_RULES_COLLECTION.to_string(),
            workflows_collection: crate::executor::DEFAULT_WORKFLOWS_COLLECTION.to_string(),
            http_timeout: Duration::from_secs(30),
            max_concurrent_jobs: 4,
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.queue, QueueBackend::Memory);
        assert_eq!(config.nats_stream, "flowline_jobs");
        assert_eq!(config.rules_collection, "workflow-rules");
        assert_eq!(config.workflows_collection, "workflows");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.store_url.is_none());
    }

    #[test]
    fn test_queue_backend_parsing() {
        assert_eq!("memory".parse::<QueueBackend>().unwrap(), QueueBackend::Memory);
        assert_eq!("NATS".parse::<QueueBackend>().unwrap(), QueueBackend::Nats);
        assert!("kafka".parse::<QueueBackend>().is_err());
    }
}
