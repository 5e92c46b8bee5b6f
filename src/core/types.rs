//! Atelier Core Type Definitions
//!
//! Defines fundamental types used throughout the job-processing core.

use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Job unique identifier (ULID)
pub type JobId = String;

/// Asset record unique identifier (ULID)
pub type AssetId = String;

/// Canvas unique identifier (ULID)
pub type CanvasId = String;

/// Widget unique identifier (ULID)
pub type WidgetId = String;

/// Trained model unique identifier (ULID)
pub type ModelId = String;

/// Named queue identifier (e.g. `ai:image`)
pub type QueueName = String;

// =============================================================================
// Progress
// =============================================================================

/// A single progress report pushed by a handler mid-execution.
///
/// Percent is clamped to 0–100 at construction. Handlers are expected to
/// report non-decreasing percents, but nothing downstream relies on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Completion percent, 0–100
    pub percent: u8,
    /// Human-readable milestone description
    pub message: String,
}

impl ProgressUpdate {
    /// Creates a new progress update, clamping percent to 100
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_update_clamps_percent() {
        let update = ProgressUpdate::new(150, "overshoot");
        assert_eq!(update.percent, 100);

        let update = ProgressUpdate::new(42, "encoding");
        assert_eq!(update.percent, 42);
        assert_eq!(update.message, "encoding");
    }

    #[test]
    fn test_progress_update_serialization() {
        let update = ProgressUpdate::new(50, "halfway");
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"percent\":50"));
        assert!(json.contains("\"message\":\"halfway\""));
    }
}
