//! Job queue backends.
//!
//! Producers see a queue through [`JobQueue`]; the worker pulls from it
//! through [`JobSource`]. Delivery is at-least-once: a job whose task fails
//! is redelivered until [`RetryConfig::max_attempts`] deliveries were made.
//!
//! - [`InMemoryJobQueue`] - tokio channel, process-local
//! - [`NatsJobQueue`] - NATS JetStream stream with a durable pull consumer

mod memory;
mod nats;

pub use memory::InMemoryJobQueue;
pub use nats::{NatsJobQueue, DEFAULT_JOBS_SUBJECT};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowline_core::{Job, JobId, QueueError, RetryConfig};

/// A job as it travels through a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEnvelope {
    pub id: JobId,

    /// Delivery number, starting at 1.
    #[serde(default = "first_attempt")]
    pub attempt: u32,

    pub enqueued_at: DateTime<Utc>,

    pub job: Job,
}

fn first_attempt() -> u32 {
    1
}

impl JobEnvelope {
    pub fn new(job: Job) -> Self {
        Self {
            id: JobId::new_v4(),
            attempt: first_attempt(),
            enqueued_at: Utc::now(),
            job,
        }
    }
}

/// Settles one delivery with its backend.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// The job finished; remove it from the queue.
    async fn ack(&self, envelope: &JobEnvelope) -> Result<(), QueueError>;

    /// The job failed; redeliver it if attempts remain.
    async fn nak(&self, envelope: &JobEnvelope) -> Result<(), QueueError>;
}

/// One received job plus the handle to settle it.
pub struct Delivery {
    pub envelope: JobEnvelope,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(envelope: JobEnvelope, acker: Box<dyn Acknowledger>) -> Self {
        Self { envelope, acker }
    }

    pub async fn ack(&self) -> Result<(), QueueError> {
        self.acker.ack(&self.envelope).await
    }

    pub async fn nak(&self) -> Result<(), QueueError> {
        self.acker.nak(&self.envelope).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("envelope", &self.envelope)
            .finish_non_exhaustive()
    }
}

/// Consumer side of a queue.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Wait for the next job. `Ok(None)` means nothing arrived in time; the
    /// caller should poll again.
    async fn receive(&self) -> Result<Option<Delivery>, QueueError>;
}

/// Log the give-up decision for an exhausted job.
pub(crate) fn log_exhausted(envelope: &JobEnvelope, retry: &RetryConfig) {
    tracing::error!(
        job_id = %envelope.id,
        task = %envelope.job.task,
        attempt = envelope.attempt,
        max_attempts = retry.max_attempts,
        "Job failed on its last attempt; dropping"
    );
}
