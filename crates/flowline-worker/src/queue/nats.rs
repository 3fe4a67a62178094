//! NATS JetStream job queue.

use async_nats::jetstream::{
    self,
    consumer::{pull::Config as ConsumerConfig, Consumer},
    AckKind, Context,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

use flowline_core::{Job, JobId, JobQueue, QueueError, RetryConfig};

use super::{log_exhausted, Acknowledger, Delivery, JobEnvelope, JobSource};

/// Default subject carrying job envelopes.
pub const DEFAULT_JOBS_SUBJECT: &str = "flowline.jobs";

/// How long one fetch waits for a message.
const FETCH_EXPIRY: Duration = Duration::from_secs(5);

fn transport(e: impl std::fmt::Display) -> QueueError {
    QueueError::Transport(e.to_string())
}

/// Job queue backed by a JetStream stream and a durable pull consumer.
pub struct NatsJobQueue {
    /// JetStream context.
    js: Context,

    /// Durable consumer shared by all workers.
    consumer: Consumer<ConsumerConfig>,

    /// Subject jobs are published to.
    subject: String,

    retry: RetryConfig,
}

impl NatsJobQueue {
    /// Ensure the stream and consumer exist and return a queue over them.
    pub async fn new(
        client: async_nats::Client,
        stream: &str,
        consumer: &str,
        retry: RetryConfig,
    ) -> Result<Self, QueueError> {
        let js = jetstream::new(client);
        let subject = DEFAULT_JOBS_SUBJECT.to_string();

        let stream_handle = match js.get_stream(stream).await {
            Ok(existing) => {
                tracing::debug!(stream = %stream, "Using existing NATS stream");
                existing
            }
            Err(_) => {
                let config = jetstream::stream::Config {
                    name: stream.to_string(),
                    subjects: vec![subject.clone()],
                    storage: jetstream::stream::StorageType::File,
                    ..Default::default()
                };
                let created = js.create_stream(config).await.map_err(transport)?;
                tracing::info!(stream = %stream, subject = %subject, "Created NATS stream");
                created
            }
        };

        let consumer_handle = match stream_handle.get_consumer(consumer).await {
            Ok(existing) => existing,
            Err(_) => {
                let config = ConsumerConfig {
                    durable_name: Some(consumer.to_string()),
                    filter_subject: subject.clone(),
                    max_deliver: i64::from(retry.max_attempts),
                    ..Default::default()
                };
                let created = stream_handle
                    .create_consumer(config)
                    .await
                    .map_err(transport)?;
                tracing::info!(consumer = %consumer, "Created NATS consumer");
                created
            }
        };

        Ok(Self {
            js,
            consumer: consumer_handle,
            subject,
            retry,
        })
    }
}

#[async_trait]
impl JobQueue for NatsJobQueue {
    async fn enqueue(&self, job: Job) -> Result<JobId, QueueError> {
        let envelope = JobEnvelope::new(job);
        let payload = serde_json::to_vec(&envelope)?;

        self.js
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(transport)?
            .await
            .map_err(transport)?;

        tracing::debug!(job_id = %envelope.id, task = %envelope.job.task, "Published job");
        Ok(envelope.id)
    }
}

#[async_trait]
impl JobSource for NatsJobQueue {
    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(1)
            .expires(FETCH_EXPIRY)
            .messages()
            .await
            .map_err(transport)?;

        let Some(msg) = messages.next().await else {
            return Ok(None);
        };
        let msg = msg.map_err(transport)?;

        let mut envelope: JobEnvelope = match serde_json::from_slice(&msg.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, "Discarding undecodable job message");
                msg.ack_with(AckKind::Term).await.map_err(transport)?;
                return Ok(None);
            }
        };

        if let Ok(info) = msg.info() {
            envelope.attempt = u32::try_from(info.delivered).unwrap_or(envelope.attempt);
        }

        let acker = NatsAcker {
            msg,
            retry: self.retry.clone(),
        };
        Ok(Some(Delivery::new(envelope, Box::new(acker))))
    }
}

struct NatsAcker {
    msg: jetstream::Message,
    retry: RetryConfig,
}

#[async_trait]
impl Acknowledger for NatsAcker {
    async fn ack(&self, _envelope: &JobEnvelope) -> Result<(), QueueError> {
        self.msg.ack().await.map_err(transport)
    }

    async fn nak(&self, envelope: &JobEnvelope) -> Result<(), QueueError> {
        if !self.retry.should_retry(envelope.attempt) {
            log_exhausted(envelope, &self.retry);
            return self.msg.ack_with(AckKind::Term).await.map_err(transport);
        }

        let delay = self.retry.delay_for(envelope.attempt);
        tracing::warn!(
            job_id = %envelope.id,
            attempt = envelope.attempt,
            delay_ms = delay.as_millis() as u64,
            "Requesting job redelivery"
        );
        self.msg
            .ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(transport)
    }
}
