//! In-Memory Queue Transport
//!
//! Reference `QueueTransport` used by tests and single-process embeddings.
//! FIFO claim order, per-entry retry delay, terminal-state guards, and a
//! dead-letter store. Production deployments back the same trait with a
//! durable broker instead.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{CoreError, CoreResult, JobId, ProgressUpdate, QueueName};

use super::super::jobs::{JobEnvelope, JobStatus};
use super::{FailureInfo, QueueTransport, RequeueDecision, RetryPolicy};

// =============================================================================
// Internal State
// =============================================================================

/// A pending queue entry with its earliest claim time
struct PendingEntry<P> {
    envelope: JobEnvelope<P>,
    available_at: Instant,
}

/// Bookkeeping for one known job
#[derive(Clone, Debug)]
struct JobState {
    status: JobStatus,
    attempt: u32,
}

/// A dead-lettered job plus the failure that parked it
#[derive(Clone, Debug)]
pub struct DeadLetter<P> {
    /// The envelope as of its final attempt
    pub envelope: JobEnvelope<P>,
    /// Why it was parked
    pub failure: FailureInfo,
}

struct QueueInner<P> {
    pending: VecDeque<PendingEntry<P>>,
    jobs: HashMap<JobId, JobState>,
    progress: HashMap<JobId, ProgressUpdate>,
    dead_letters: Vec<DeadLetter<P>>,
}

// =============================================================================
// In-Memory Queue
// =============================================================================

/// In-memory FIFO queue transport for one named queue
pub struct InMemoryQueue<P> {
    name: QueueName,
    retry: RetryPolicy,
    inner: Mutex<QueueInner<P>>,
}

impl<P> InMemoryQueue<P> {
    /// Creates an empty queue. The retry policy is mandatory — the queue
    /// owner decides how many attempts a job gets before dead-lettering.
    pub fn new(name: impl Into<QueueName>, retry: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            retry,
            inner: Mutex::new(QueueInner {
                pending: VecDeque::new(),
                jobs: HashMap::new(),
                progress: HashMap::new(),
                dead_letters: Vec::new(),
            }),
        }
    }

    /// Enqueues a payload as a fresh job and returns its ID
    pub fn enqueue(&self, payload: P) -> JobId {
        let envelope = JobEnvelope::new(&self.name, payload);
        let job_id = envelope.id.clone();

        let mut inner = self.inner.lock().unwrap();
        inner.jobs.insert(
            job_id.clone(),
            JobState {
                status: JobStatus::Pending,
                attempt: 0,
            },
        );
        inner.pending.push_back(PendingEntry {
            envelope,
            available_at: Instant::now(),
        });

        debug!(queue = %self.name, job_id = %job_id, "Job enqueued");
        job_id
    }

    /// Number of jobs waiting to be claimed
    pub fn pending_len(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Current status of a job, if known
    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .get(job_id)
            .map(|s| s.status.clone())
    }

    /// Attempts consumed by a job so far
    pub fn attempt(&self, job_id: &str) -> Option<u32> {
        self.inner.lock().unwrap().jobs.get(job_id).map(|s| s.attempt)
    }

    /// Most recent progress update reported for a job
    pub fn latest_progress(&self, job_id: &str) -> Option<ProgressUpdate> {
        self.inner.lock().unwrap().progress.get(job_id).cloned()
    }
}

impl<P: Clone> InMemoryQueue<P> {
    /// Dead-lettered jobs awaiting external intervention
    pub fn dead_letters(&self) -> Vec<DeadLetter<P>> {
        self.inner.lock().unwrap().dead_letters.clone()
    }
}

#[async_trait]
impl<P: Send + Sync> QueueTransport<P> for InMemoryQueue<P> {
    fn queue_name(&self) -> &str {
        &self.name
    }

    async fn claim_next(&self) -> CoreResult<Option<JobEnvelope<P>>> {
        let mut inner = self.inner.lock().unwrap();

        let now = Instant::now();
        let due = inner
            .pending
            .iter()
            .position(|entry| entry.available_at <= now);

        let Some(index) = due else {
            return Ok(None);
        };

        // remove() preserves FIFO order of the remaining entries
        let entry = inner
            .pending
            .remove(index)
            .ok_or_else(|| CoreError::Internal("pending entry vanished under lock".to_string()))?;

        let mut envelope = entry.envelope;
        envelope.attempt += 1;
        envelope.status = JobStatus::InProgress;
        envelope.touch();

        if let Some(state) = inner.jobs.get_mut(&envelope.id) {
            state.status = JobStatus::InProgress;
            state.attempt = envelope.attempt;
        }

        Ok(Some(envelope))
    }

    async fn ack(&self, job_id: &str) -> CoreResult<()> {
        let mut inner = self.inner.lock().unwrap();

        let state = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;

        if state.status.is_terminal() {
            return Err(CoreError::InvalidJobTransition {
                job_id: job_id.to_string(),
                from: state.status.to_string(),
                to: JobStatus::Succeeded.to_string(),
            });
        }

        state.status = JobStatus::Succeeded;
        inner.progress.remove(job_id);
        Ok(())
    }

    async fn requeue_or_dead_letter(
        &self,
        mut envelope: JobEnvelope<P>,
        failure: FailureInfo,
    ) -> CoreResult<RequeueDecision> {
        let mut inner = self.inner.lock().unwrap();

        let state = inner
            .jobs
            .get_mut(&envelope.id)
            .ok_or_else(|| CoreError::JobNotFound(envelope.id.clone()))?;

        if state.status.is_terminal() {
            return Err(CoreError::InvalidJobTransition {
                job_id: envelope.id.clone(),
                from: state.status.to_string(),
                to: JobStatus::Failed.to_string(),
            });
        }

        if self.retry.can_retry(envelope.attempt) {
            let delay = self.retry.backoff.delay_for(envelope.attempt);
            let next_attempt = envelope.attempt + 1;

            state.status = JobStatus::Pending;
            envelope.status = JobStatus::Pending;
            envelope.touch();

            debug!(
                queue = %self.name,
                job_id = %envelope.id,
                attempt = envelope.attempt,
                delay_ms = delay.as_millis() as u64,
                "Job requeued"
            );

            inner.pending.push_back(PendingEntry {
                envelope,
                available_at: Instant::now() + delay,
            });

            Ok(RequeueDecision::Requeued { next_attempt })
        } else {
            state.status = JobStatus::Failed;
            envelope.status = JobStatus::Failed;
            envelope.touch();

            debug!(
                queue = %self.name,
                job_id = %envelope.id,
                attempts = envelope.attempt,
                "Job dead-lettered"
            );

            inner.dead_letters.push(DeadLetter { envelope, failure });
            Ok(RequeueDecision::DeadLettered)
        }
    }

    async fn report_progress(&self, job_id: &str, update: ProgressUpdate) -> CoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.progress.insert(job_id.to_string(), update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue::{BackoffStrategy, FailureKind};
    use std::time::Duration;

    fn queue() -> InMemoryQueue<String> {
        InMemoryQueue::new(
            "ai:test",
            RetryPolicy::new(2).with_backoff(BackoffStrategy::Fixed(Duration::ZERO)),
        )
    }

    fn failure(attempt: u32) -> FailureInfo {
        FailureInfo {
            kind: FailureKind::Generation,
            message: "boom".to_string(),
            attempt,
        }
    }

    #[tokio::test]
    async fn test_claim_increments_attempt_and_marks_in_progress() {
        let q = queue();
        let job_id = q.enqueue("paint a fox".to_string());

        let envelope = q.claim_next().await.unwrap().unwrap();
        assert_eq!(envelope.id, job_id);
        assert_eq!(envelope.attempt, 1);
        assert!(matches!(envelope.status, JobStatus::InProgress));
        assert_eq!(q.attempt(&job_id), Some(1));
        assert_eq!(q.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_claim_order_is_fifo() {
        let q = queue();
        let first = q.enqueue("first".to_string());
        let second = q.enqueue("second".to_string());

        assert_eq!(q.claim_next().await.unwrap().unwrap().id, first);
        assert_eq!(q.claim_next().await.unwrap().unwrap().id, second);
        assert!(q.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ack_is_terminal() {
        let q = queue();
        let job_id = q.enqueue("job".to_string());
        let _ = q.claim_next().await.unwrap().unwrap();

        q.ack(&job_id).await.unwrap();
        assert!(matches!(q.status(&job_id), Some(JobStatus::Succeeded)));

        // A second resolve on a terminal job is rejected, not absorbed
        let err = q.ack(&job_id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidJobTransition { .. }));
    }

    #[tokio::test]
    async fn test_requeue_until_exhausted_then_dead_letter() {
        let q = queue();
        let job_id = q.enqueue("job".to_string());

        let envelope = q.claim_next().await.unwrap().unwrap();
        let decision = q
            .requeue_or_dead_letter(envelope, failure(1))
            .await
            .unwrap();
        assert_eq!(decision, RequeueDecision::Requeued { next_attempt: 2 });
        assert!(matches!(q.status(&job_id), Some(JobStatus::Pending)));

        let envelope = q.claim_next().await.unwrap().unwrap();
        assert_eq!(envelope.attempt, 2);
        let decision = q
            .requeue_or_dead_letter(envelope, failure(2))
            .await
            .unwrap();
        assert_eq!(decision, RequeueDecision::DeadLettered);
        assert!(matches!(q.status(&job_id), Some(JobStatus::Failed)));

        let parked = q.dead_letters();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].envelope.id, job_id);
        assert_eq!(parked[0].failure.attempt, 2);
    }

    #[tokio::test]
    async fn test_requeue_respects_backoff_delay() {
        let q = InMemoryQueue::new(
            "ai:test",
            RetryPolicy::new(3).with_backoff(BackoffStrategy::Fixed(Duration::from_secs(60))),
        );
        q.enqueue("job".to_string());

        let envelope = q.claim_next().await.unwrap().unwrap();
        q.requeue_or_dead_letter(envelope, failure(1)).await.unwrap();

        // Not claimable again until the backoff delay has elapsed
        assert!(q.claim_next().await.unwrap().is_none());
        assert_eq!(q.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_report_progress_keeps_latest() {
        let q = queue();
        let job_id = q.enqueue("job".to_string());
        let _ = q.claim_next().await.unwrap();

        q.report_progress(&job_id, ProgressUpdate::new(10, "start"))
            .await
            .unwrap();
        q.report_progress(&job_id, ProgressUpdate::new(70, "rendering"))
            .await
            .unwrap();

        let latest = q.latest_progress(&job_id).unwrap();
        assert_eq!(latest.percent, 70);
    }

    #[tokio::test]
    async fn test_ack_unknown_job() {
        let q = queue();
        let err = q.ack("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::JobNotFound(_)));
    }
}
