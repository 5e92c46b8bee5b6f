//! Queue Transport Module
//!
//! The narrow interface between the worker engines and whatever durable
//! queue broker the embedding application runs. The engine only ever
//! claims, acks, resolves failures, and forwards progress; everything else
//! (replication, delivery guarantees, archival) belongs to the transport.

mod memory;

pub use memory::*;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CoreError, CoreResult, ProgressUpdate};

use super::jobs::JobEnvelope;

// =============================================================================
// Retry Policy
// =============================================================================

/// Backoff strategy applied between retry attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackoffStrategy {
    /// Same delay for every retry
    Fixed(Duration),
    /// Base delay doubled per attempt
    Exponential(Duration),
    /// Explicit per-attempt delays; the last entry repeats
    Custom(Vec<Duration>),
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential(Duration::from_secs(1))
    }
}

impl BackoffStrategy {
    /// Computes the delay before the given retry attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential(base) => {
                let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(multiplier)
            }
            BackoffStrategy::Custom(delays) => {
                if delays.is_empty() {
                    return Duration::ZERO;
                }
                let index = (attempt.saturating_sub(1) as usize).min(delays.len() - 1);
                delays[index]
            }
        }
    }

    /// Fixed delay in seconds
    pub fn fixed(seconds: u64) -> Self {
        Self::Fixed(Duration::from_secs(seconds))
    }

    /// Exponential delay with the given base in seconds
    pub fn exponential(seconds: u64) -> Self {
        Self::Exponential(Duration::from_secs(seconds))
    }
}

/// Retry policy for one queue.
///
/// `max_attempts` counts total processing attempts, the first claim
/// included. It has no default: the embedding application must decide how
/// many times a generation job may run before dead-lettering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts before a job is dead-lettered (>= 1)
    pub max_attempts: u32,
    /// Delay schedule between attempts
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Creates a policy with the mandatory attempt ceiling
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffStrategy::default(),
        }
    }

    /// Sets the backoff strategy
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// True while the job is still entitled to another attempt
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

// =============================================================================
// Failure Reporting
// =============================================================================

/// Broad class of a job failure, carried to the transport for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The primary generation step failed
    Generation,
    /// The payload failed validation before generation
    Validation,
    /// The provider was missing or unreachable
    Provider,
    /// The generation call timed out
    Timeout,
    /// Anything else that escaped the handler
    Internal,
}

impl From<&CoreError> for FailureKind {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::ValidationError(_) => FailureKind::Validation,
            CoreError::ProviderUnavailable(_) | CoreError::NotSupported(_) => FailureKind::Provider,
            CoreError::Timeout(_) => FailureKind::Timeout,
            CoreError::GenerationFailed(_) => FailureKind::Generation,
            _ => FailureKind::Internal,
        }
    }
}

/// Failure descriptor handed to `requeue_or_dead_letter`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureInfo {
    /// Failure class
    pub kind: FailureKind,
    /// Human-readable cause
    pub message: String,
    /// Attempt number the failure happened on
    pub attempt: u32,
}

impl FailureInfo {
    /// Builds failure info from a handler error
    pub fn from_error(err: &CoreError, attempt: u32) -> Self {
        Self {
            kind: FailureKind::from(err),
            message: err.to_string(),
            attempt,
        }
    }
}

/// What the transport decided to do with a failed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequeueDecision {
    /// Job went back to the queue for another attempt
    Requeued { next_attempt: u32 },
    /// Retries exhausted; job parked for external intervention
    DeadLettered,
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Claim/ack/resolve primitives for one named queue.
///
/// Mutual exclusion of claims is the transport's responsibility: a job
/// handed out by `claim_next` must not be handed out again until it is
/// resolved or requeued.
#[async_trait]
pub trait QueueTransport<P>: Send + Sync {
    /// The queue this transport serves
    fn queue_name(&self) -> &str;

    /// Claims the next available job, or `None` when the queue is empty.
    /// Claiming increments the envelope's attempt count and moves it to
    /// `InProgress`.
    async fn claim_next(&self) -> CoreResult<Option<JobEnvelope<P>>>;

    /// Acknowledges successful completion; the job becomes terminal
    async fn ack(&self, job_id: &str) -> CoreResult<()>;

    /// Routes a failed job back to the queue or to the dead-letter store,
    /// according to the transport's retry policy
    async fn requeue_or_dead_letter(
        &self,
        envelope: JobEnvelope<P>,
        failure: FailureInfo,
    ) -> CoreResult<RequeueDecision>;

    /// Forwards a progress update for an in-flight job. Transports without
    /// progress tracking keep the default no-op.
    async fn report_progress(&self, _job_id: &str, _update: ProgressUpdate) -> CoreResult<()> {
        Ok(())
    }
}
