//! Job System Module
//!
//! Bounded-concurrency execution of long-running AI generation jobs
//! (image, video, widget, LoRA training) outside the request path.

pub mod handlers;

mod payloads;
mod progress;
mod registry;
mod worker;

pub use handlers::*;
pub use payloads::*;
pub use progress::*;
pub use registry::*;
pub use worker::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CoreResult, JobId, QueueName};

// =============================================================================
// Job Status
// =============================================================================

/// Job lifecycle status.
///
/// `Succeeded` and `Failed` are terminal; a terminal job never transitions
/// again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    /// Waiting in queue
    #[default]
    Pending,
    /// Claimed by a worker slot
    InProgress,
    /// Completed successfully (possibly with a degraded auxiliary outcome)
    Succeeded,
    /// Exhausted its attempts
    Failed,
}

impl JobStatus {
    /// Checks whether the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InProgress => write!(f, "inProgress"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Job Envelope
// =============================================================================

/// One unit of queued work: a typed payload plus bookkeeping.
///
/// The envelope is created by the enqueuing side; workers only advance
/// `status` and `attempt` through the queue transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEnvelope<P> {
    /// Unique job ID, stable for the job's lifetime
    pub id: JobId,
    /// Queue this job belongs to
    pub queue_name: QueueName,
    /// Handler-specific payload
    pub payload: P,
    /// Processing attempts so far; incremented on each claim
    pub attempt: u32,
    /// Current status
    pub status: JobStatus,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
    /// Last transition timestamp (RFC3339)
    pub updated_at: String,
}

impl<P> JobEnvelope<P> {
    /// Creates a fresh pending envelope
    pub fn new(queue_name: impl Into<QueueName>, payload: P) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: ulid::Ulid::new().to_string(),
            queue_name: queue_name.into(),
            payload,
            attempt: 0,
            status: JobStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Stamps the last-transition time
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

// =============================================================================
// Job Output
// =============================================================================

/// Outcome of the non-critical follow-up work a handler performs after the
/// primary result exists (e.g. persisting an asset record).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuxiliaryOutcome {
    /// Secondary persistence completed
    Ok,
    /// Secondary persistence failed; the job still succeeded
    Degraded { reason: String },
}

impl AuxiliaryOutcome {
    /// Builds a degraded outcome with a reason
    pub fn degraded(reason: impl Into<String>) -> Self {
        AuxiliaryOutcome::Degraded {
            reason: reason.into(),
        }
    }

    /// Checks whether secondary persistence was skipped or failed
    pub fn is_degraded(&self) -> bool {
        matches!(self, AuxiliaryOutcome::Degraded { .. })
    }
}

/// Terminal success value of a handler invocation.
///
/// `primary` is the generated result; `auxiliary` says whether the
/// follow-up persistence landed. A degraded auxiliary outcome never turns
/// the job into a failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput<R> {
    /// The primary generation result
    pub primary: R,
    /// Whether secondary persistence succeeded
    pub auxiliary: AuxiliaryOutcome,
}

impl<R> JobOutput<R> {
    /// Success with intact secondary persistence
    pub fn ok(primary: R) -> Self {
        Self {
            primary,
            auxiliary: AuxiliaryOutcome::Ok,
        }
    }

    /// Success with failed secondary persistence
    pub fn degraded(primary: R, reason: impl Into<String>) -> Self {
        Self {
            primary,
            auxiliary: AuxiliaryOutcome::degraded(reason),
        }
    }
}

// =============================================================================
// Handler Contract
// =============================================================================

/// Type-specific job logic, one implementation per job kind.
///
/// A handler performs the primary generation step (errors propagate and
/// drive the retry policy), reports progress at milestones, and absorbs
/// secondary-persistence failures into a degraded-but-successful output.
#[async_trait]
pub trait JobHandler<P>: Send + Sync {
    /// Typed result of a successful invocation
    type Output: serde::Serialize + Send + 'static;

    /// Handler name for logs
    fn name(&self) -> &str;

    /// Executes one job
    async fn handle(
        &self,
        job: &JobEnvelope<P>,
        progress: ProgressReporter,
    ) -> CoreResult<JobOutput<Self::Output>>;
}
