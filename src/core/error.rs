//! Atelier Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::{AssetId, JobId, QueueName};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Queue Errors
    // =========================================================================
    #[error("Queue closed: {0}")]
    QueueClosed(QueueName),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Invalid job transition for {job_id}: {from} -> {to}")]
    InvalidJobTransition {
        job_id: JobId,
        from: String,
        to: String,
    },

    // =========================================================================
    // Registration Errors
    // =========================================================================
    #[error("Processor for queue '{0}' has already started")]
    ProcessorAlreadyStarted(QueueName),

    // =========================================================================
    // Generation Errors
    // =========================================================================
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    #[error("Duplicate asset record: {0}")]
    DuplicateAsset(AssetId),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// True when the error comes from the primary generation path and
    /// should drive the job into the requeue/dead-letter policy.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            CoreError::GenerationFailed(_)
                | CoreError::ProviderUnavailable(_)
                | CoreError::NotSupported(_)
                | CoreError::ValidationError(_)
                | CoreError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::GenerationFailed("provider returned 502".to_string());
        assert_eq!(err.to_string(), "Generation failed: provider returned 502");

        let err = CoreError::ProcessorAlreadyStarted("ai:image".to_string());
        assert!(err.to_string().contains("ai:image"));
    }

    #[test]
    fn test_generation_failure_classification() {
        assert!(CoreError::GenerationFailed("x".into()).is_generation_failure());
        assert!(CoreError::ValidationError("x".into()).is_generation_failure());
        assert!(!CoreError::DuplicateAsset("a".into()).is_generation_failure());
        assert!(!CoreError::JobNotFound("j".into()).is_generation_failure());
    }
}
