//! Worker Engine Module
//!
//! Bounded-concurrency consumption of one named queue. Each engine owns a
//! fixed number of slots; every slot is an independent task running a
//! sequential claim → execute → resolve loop against the queue transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use crate::core::queue::{FailureInfo, QueueTransport, RequeueDecision};
use crate::core::{JobId, QueueName};

use super::{JobEnvelope, JobHandler, ProgressChannel, DEFAULT_PROGRESS_BUFFER};

// =============================================================================
// Shutdown Signal
// =============================================================================

/// Cooperative stop signal shared by every slot loop of a process.
///
/// Slots only observe the signal between claims; an in-flight handler runs
/// to completion.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Creates an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown; wakes idle slots immediately
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Checks whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Resolves when shutdown is requested
    pub async fn notified(&self) {
        if self.is_triggered() {
            return;
        }
        self.notify.notified().await;
    }
}

// =============================================================================
// Worker Configuration
// =============================================================================

/// Per-queue worker engine configuration
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Hard cap on simultaneous handler invocations for this queue
    pub concurrency: usize,
    /// Sleep between claim polls when the queue is empty
    pub idle_backoff: Duration,
    /// Buffered progress updates per job before the oldest is dropped
    pub progress_buffer: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            idle_backoff: Duration::from_millis(250),
            progress_buffer: DEFAULT_PROGRESS_BUFFER,
        }
    }
}

impl WorkerConfig {
    /// Creates a config with the given concurrency cap
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            ..Default::default()
        }
    }

    /// Sets the idle claim backoff
    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    /// Sets the progress buffer size
    pub fn with_progress_buffer(mut self, size: usize) -> Self {
        self.progress_buffer = size.max(1);
        self
    }
}

// =============================================================================
// Job Events
// =============================================================================

/// Job lifecycle event emitted by a worker engine
#[derive(Clone, Debug)]
pub enum JobEvent {
    /// A slot claimed a job and is about to run the handler
    Started {
        job_id: JobId,
        queue_name: QueueName,
        attempt: u32,
    },
    /// Handler succeeded and the job was acked
    Completed {
        job_id: JobId,
        queue_name: QueueName,
        /// Serialized `JobOutput` of the handler
        result: serde_json::Value,
        /// True when secondary persistence was absorbed as degraded
        degraded: bool,
    },
    /// Handler failed; the transport routed the job per retry policy
    Failed {
        job_id: JobId,
        queue_name: QueueName,
        error: String,
        /// True when the job went back to the queue for another attempt
        requeued: bool,
    },
}

// =============================================================================
// Processor Handle
// =============================================================================

/// Object-safe face of a worker engine, as held by the registry
pub trait ProcessorHandle: Send + Sync {
    /// Queue this engine consumes
    fn queue_name(&self) -> &str;

    /// Configured concurrency cap
    fn concurrency(&self) -> usize;

    /// Whether `start` has already spawned the slot loops
    fn is_started(&self) -> bool;

    /// Spawns the slot loops once; later calls return no new handles
    fn start(&self, shutdown: Arc<Shutdown>) -> Vec<tokio::task::JoinHandle<()>>;
}

// =============================================================================
// Queue Worker
// =============================================================================

/// Generic worker engine for one named queue.
///
/// The payload type parameter ties the engine to its handler at compile
/// time: a queue of image payloads can only be wired to an image handler.
pub struct QueueWorker<P, H: JobHandler<P>> {
    transport: Arc<dyn QueueTransport<P>>,
    handler: Arc<H>,
    config: WorkerConfig,
    /// Process-unique tag for log correlation
    worker_tag: String,
    event_tx: mpsc::UnboundedSender<JobEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<JobEvent>>>,
    started: AtomicBool,
}

impl<P, H> QueueWorker<P, H>
where
    P: Send + Sync + 'static,
    H: JobHandler<P> + 'static,
{
    /// Creates an engine bound to a transport and handler
    pub fn new(transport: Arc<dyn QueueTransport<P>>, handler: Arc<H>, config: WorkerConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            transport,
            handler,
            config,
            worker_tag: uuid::Uuid::new_v4().to_string(),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            started: AtomicBool::new(false),
        }
    }

    /// Takes the event receiver (can only be taken once)
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<JobEvent>> {
        self.event_rx.lock().unwrap().take()
    }

    /// Runs one claimed job to resolution
    async fn process_one(
        transport: &Arc<dyn QueueTransport<P>>,
        handler: &Arc<H>,
        event_tx: &mpsc::UnboundedSender<JobEvent>,
        progress_buffer: usize,
        envelope: JobEnvelope<P>,
    ) {
        let job_id = envelope.id.clone();
        let queue_name = envelope.queue_name.clone();

        let _ = event_tx.send(JobEvent::Started {
            job_id: job_id.clone(),
            queue_name: queue_name.clone(),
            attempt: envelope.attempt,
        });

        info!(
            queue = %queue_name,
            job_id = %job_id,
            attempt = envelope.attempt,
            handler = handler.name(),
            "Processing job"
        );

        // Progress flows through a bounded side-channel so a slow sink can
        // never stall the handler. Forwarding failures are logged and
        // absorbed; they must not affect the job outcome.
        let channel = Arc::new(ProgressChannel::new(progress_buffer));
        let reporter = channel.reporter();

        let forwarder = {
            let transport = Arc::clone(transport);
            let channel = Arc::clone(&channel);
            let job_id = job_id.clone();
            tokio::spawn(async move {
                while let Some(update) = channel.recv().await {
                    if let Err(e) = transport.report_progress(&job_id, update).await {
                        warn!(job_id = %job_id, error = %e, "Progress forwarding failed");
                    }
                }
            })
        };

        let outcome = handler.handle(&envelope, reporter).await;

        // Drain buffered updates before resolving
        channel.close();
        let _ = forwarder.await;

        match outcome {
            Ok(output) => {
                let degraded = output.auxiliary.is_degraded();
                let result = serde_json::to_value(&output).unwrap_or_default();

                if let Err(e) = transport.ack(&job_id).await {
                    // The domain work already succeeded; a transport ack
                    // failure is not a generation failure.
                    error!(job_id = %job_id, error = %e, "Ack failed after successful handler");
                }

                if degraded {
                    warn!(job_id = %job_id, "Job completed with degraded auxiliary outcome");
                } else {
                    info!(job_id = %job_id, "Job completed");
                }

                let _ = event_tx.send(JobEvent::Completed {
                    job_id,
                    queue_name,
                    result,
                    degraded,
                });
            }
            Err(err) => {
                let failure = FailureInfo::from_error(&err, envelope.attempt);

                match transport.requeue_or_dead_letter(envelope, failure).await {
                    Ok(RequeueDecision::Requeued { next_attempt }) => {
                        warn!(
                            job_id = %job_id,
                            error = %err,
                            next_attempt,
                            "Job failed, requeued"
                        );
                        let _ = event_tx.send(JobEvent::Failed {
                            job_id,
                            queue_name,
                            error: err.to_string(),
                            requeued: true,
                        });
                    }
                    Ok(RequeueDecision::DeadLettered) => {
                        error!(job_id = %job_id, error = %err, "Job dead-lettered");
                        let _ = event_tx.send(JobEvent::Failed {
                            job_id,
                            queue_name,
                            error: err.to_string(),
                            requeued: false,
                        });
                    }
                    Err(resolve_err) => {
                        // Never silently drop a failed job: surface both
                        // the handler error and the transport error.
                        error!(
                            job_id = %job_id,
                            handler_error = %err,
                            transport_error = %resolve_err,
                            "Failed to resolve failed job"
                        );
                        let _ = event_tx.send(JobEvent::Failed {
                            job_id,
                            queue_name,
                            error: err.to_string(),
                            requeued: false,
                        });
                    }
                }
            }
        }
    }

    /// One slot: a strictly sequential claim → execute → resolve loop
    async fn slot_loop(
        slot: usize,
        worker_tag: String,
        transport: Arc<dyn QueueTransport<P>>,
        handler: Arc<H>,
        event_tx: mpsc::UnboundedSender<JobEvent>,
        config: WorkerConfig,
        shutdown: Arc<Shutdown>,
    ) {
        let queue_name = transport.queue_name().to_string();
        debug!(queue = %queue_name, worker = %worker_tag, slot, "Worker slot started");

        while !shutdown.is_triggered() {
            tokio::select! {
                _ = shutdown.notified() => break,
                claimed = transport.claim_next() => match claimed {
                    Ok(Some(envelope)) => {
                        Self::process_one(
                            &transport,
                            &handler,
                            &event_tx,
                            config.progress_buffer,
                            envelope,
                        )
                        .await;
                    }
                    Ok(None) => {
                        tokio::time::sleep(config.idle_backoff).await;
                    }
                    Err(e) => {
                        warn!(queue = %queue_name, slot, error = %e, "Claim failed");
                        tokio::time::sleep(config.idle_backoff).await;
                    }
                },
            }
        }

        debug!(queue = %queue_name, worker = %worker_tag, slot, "Worker slot stopped");
    }
}

impl<P, H> ProcessorHandle for QueueWorker<P, H>
where
    P: Send + Sync + 'static,
    H: JobHandler<P> + 'static,
{
    fn queue_name(&self) -> &str {
        self.transport.queue_name()
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn start(&self, shutdown: Arc<Shutdown>) -> Vec<tokio::task::JoinHandle<()>> {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!(queue = %self.queue_name(), "Engine already started, ignoring");
            return Vec::new();
        }

        info!(
            queue = %self.queue_name(),
            concurrency = self.config.concurrency,
            worker = %self.worker_tag,
            "Starting worker engine"
        );

        let mut handles = Vec::with_capacity(self.config.concurrency);
        for slot in 0..self.config.concurrency {
            let transport = Arc::clone(&self.transport);
            let handler = Arc::clone(&self.handler);
            let event_tx = self.event_tx.clone();
            let config = self.config.clone();
            let shutdown = Arc::clone(&shutdown);
            let worker_tag = self.worker_tag.clone();

            handles.push(tokio::spawn(Self::slot_loop(
                slot, worker_tag, transport, handler, event_tx, config, shutdown,
            )));
        }
        handles
    }
}
