//! Worker lifecycle management.

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use flowline_core::http::ReqwestHttpClient;
use flowline_core::notify::LogNotifier;
use flowline_core::store::{InMemoryDocumentStore, RestDocumentStore};
use flowline_core::tasks::create_default_registry;
use flowline_core::{DocumentStore, JobQueue, QueueError, Services, TaskRegistry};
use flowline_rules::RuleMatcher;

use crate::config::{QueueBackend, WorkerConfig};
use crate::executor::{WorkflowExecutor, WorkflowExecutorTask};
use crate::nats::EventIntake;
use crate::queue::{Delivery, InMemoryJobQueue, JobSource, NatsJobQueue};

/// Pause after a failed receive before polling again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Build the collaborators described by `config`.
pub fn build_services(config: &WorkerConfig) -> Services {
    let store: Arc<dyn DocumentStore> = match config.store_url {
        Some(ref url) => {
            tracing::info!(store_url = %url, "Using REST document store");
            Arc::new(RestDocumentStore::new(
                url,
                config.store_api_key.clone(),
                config.http_timeout,
            ))
        }
        None => {
            tracing::info!("Using in-memory document store");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    Services::with_store(store)
        .with_http(Arc::new(ReqwestHttpClient::new(config.http_timeout)))
        .with_notifier(Arc::new(LogNotifier))
}

/// Built-in tasks plus the workflow executor.
pub fn build_registry(config: &WorkerConfig, services: &Services) -> TaskRegistry {
    let mut registry = create_default_registry(services);

    let executor = WorkflowExecutor::new(services.clone())
        .with_workflows_collection(config.workflows_collection.clone());
    registry.register(WorkflowExecutorTask::new(executor));

    registry
}

/// Pulls jobs from a queue and runs them with bounded concurrency.
pub struct Worker {
    /// Worker configuration.
    config: WorkerConfig,

    /// Task registry jobs are dispatched to.
    registry: Arc<TaskRegistry>,

    /// Consumer side of the job queue.
    source: Arc<dyn JobSource>,

    /// Event entry point, enqueueing into the same queue.
    matcher: RuleMatcher,

    /// NATS event subscription, when the NATS backend is used.
    intake: Option<Arc<EventIntake>>,

    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
}

impl Worker {
    /// Create a worker with the backends named in `config`.
    pub async fn new(config: WorkerConfig) -> Result<Self> {
        let services = build_services(&config);

        match config.queue {
            QueueBackend::Memory => {
                let queue = Arc::new(InMemoryJobQueue::new(config.retry.clone()));
                Ok(Self::with_queue(config, services, queue))
            }
            QueueBackend::Nats => {
                let client = async_nats::connect(config.nats_url.as_str()).await?;
                tracing::info!(nats_url = %config.nats_url, "Connected to NATS");

                let queue = Arc::new(
                    NatsJobQueue::new(
                        client.clone(),
                        &config.nats_stream,
                        &config.nats_consumer,
                        config.retry.clone(),
                    )
                    .await?,
                );

                let subject = config.events_subject.clone();
                let mut worker = Self::with_queue(config, services, queue);
                worker.intake = Some(Arc::new(EventIntake::new(
                    client,
                    subject,
                    worker.matcher.clone(),
                )));
                Ok(worker)
            }
        }
    }

    /// Create a worker over an existing queue and services.
    pub fn with_queue<Q>(config: WorkerConfig, services: Services, queue: Arc<Q>) -> Self
    where
        Q: JobQueue + JobSource + 'static,
    {
        let registry = Arc::new(build_registry(&config, &services));
        let matcher = RuleMatcher::new(services.store.clone(), queue.clone())
            .with_rules_collection(config.rules_collection.clone());
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));

        Self {
            config,
            registry,
            source: queue,
            matcher,
            intake: None,
            semaphore,
        }
    }

    /// Rule matcher feeding this worker's queue.
    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    /// Tasks this worker can run.
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Setup gaps that leave a standalone worker with nothing to do.
    pub fn startup_warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.intake.is_none() {
            warnings.push("No event intake; jobs only arrive through Worker::matcher or the queue");
        }
        if self.config.store_url.is_none() {
            warnings.push("STORE_URL not set; rules and workflows are read from an empty in-memory store");
        }
        warnings
    }

    /// Run until the queue closes.
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            worker_id = %self.config.worker_id,
            max_concurrent = self.config.max_concurrent_jobs,
            tasks = ?self.registry.list(),
            "Worker started"
        );
        for warning in self.startup_warnings() {
            tracing::warn!(queue = ?self.config.queue, "{}", warning);
        }

        let intake_handle = self.intake.clone().map(|intake| {
            tokio::spawn(async move {
                if let Err(e) = intake.run().await {
                    tracing::error!(error = %e, "Event intake stopped");
                }
            })
        });

        let result = self.process_jobs().await;

        if let Some(handle) = intake_handle {
            handle.abort();
        }

        result
    }

    async fn process_jobs(&self) -> Result<()> {
        loop {
            // Wait for available slot
            let permit = self.semaphore.clone().acquire_owned().await?;

            match self.source.receive().await {
                Ok(Some(delivery)) => {
                    tracing::debug!(
                        job_id = %delivery.envelope.id,
                        task = %delivery.envelope.job.task,
                        attempt = delivery.envelope.attempt,
                        "Received job"
                    );

                    let registry = self.registry.clone();
                    tokio::spawn(process_delivery(registry, delivery, permit));
                }
                Ok(None) => drop(permit),
                Err(QueueError::Closed) => {
                    tracing::info!(worker_id = %self.config.worker_id, "Job queue closed");
                    return Ok(());
                }
                Err(e) => {
                    drop(permit);
                    tracing::warn!(error = %e, "Failed to receive job");
                    tokio::time::sleep(RECEIVE_BACKOFF).await;
                }
            }
        }
    }
}

/// Run one job and settle its delivery.
async fn process_delivery(
    registry: Arc<TaskRegistry>,
    delivery: Delivery,
    permit: OwnedSemaphorePermit,
) {
    // Keep permit until done
    let _permit = permit;

    let job_id = delivery.envelope.id;
    let task = delivery.envelope.job.task.clone();
    let started = Instant::now();

    let settled = match registry.execute_job(delivery.envelope.job.clone()).await {
        Ok(output) => {
            tracing::info!(
                job_id = %job_id,
                task = %task,
                duration_ms = started.elapsed().as_millis() as u64,
                "Job completed"
            );
            tracing::debug!(job_id = %job_id, output = %output, "Job output");
            delivery.ack().await
        }
        Err(e) => {
            tracing::error!(
                job_id = %job_id,
                task = %task,
                attempt = delivery.envelope.attempt,
                error = %e,
                "Job failed"
            );
            delivery.nak().await
        }
    };

    if let Err(e) = settled {
        tracing::warn!(job_id = %job_id, error = %e, "Failed to settle job delivery");
    }
}
