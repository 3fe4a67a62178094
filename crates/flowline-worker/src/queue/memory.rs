//! Process-local job queue.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use flowline_core::{Job, JobId, JobQueue, QueueError, RetryConfig};

use super::{log_exhausted, Acknowledger, Delivery, JobEnvelope, JobSource};

/// Unbounded tokio channel acting as a job queue.
///
/// Failed jobs are re-sent after the backoff delay of [`RetryConfig`].
pub struct InMemoryJobQueue {
    sender: mpsc::UnboundedSender<JobEnvelope>,
    receiver: Mutex<mpsc::UnboundedReceiver<JobEnvelope>>,
    retry: RetryConfig,
}

impl InMemoryJobQueue {
    pub fn new(retry: RetryConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            retry,
        }
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<JobId, QueueError> {
        let envelope = JobEnvelope::new(job);
        let id = envelope.id;

        self.sender.send(envelope).map_err(|_| QueueError::Closed)?;
        tracing::debug!(job_id = %id, "Job enqueued");
        Ok(id)
    }
}

#[async_trait]
impl JobSource for InMemoryJobQueue {
    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let envelope = self.receiver.lock().await.recv().await.ok_or(QueueError::Closed)?;

        let acker = MemoryAcker {
            sender: self.sender.clone(),
            retry: self.retry.clone(),
        };
        Ok(Some(Delivery::new(envelope, Box::new(acker))))
    }
}

struct MemoryAcker {
    sender: mpsc::UnboundedSender<JobEnvelope>,
    retry: RetryConfig,
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&self, _envelope: &JobEnvelope) -> Result<(), QueueError> {
        Ok(())
    }

    async fn nak(&self, envelope: &JobEnvelope) -> Result<(), QueueError> {
        if !self.retry.should_retry(envelope.attempt) {
            log_exhausted(envelope, &self.retry);
            return Ok(());
        }

        let delay = self.retry.delay_for(envelope.attempt);
        let mut next = envelope.clone();
        next.attempt += 1;

        tracing::warn!(
            job_id = %next.id,
            attempt = next.attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling job redelivery"
        );

        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(next).is_err() {
                tracing::warn!("Queue closed before redelivery");
            }
        });
        Ok(())
    }
}
