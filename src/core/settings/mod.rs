//! Worker Settings Persistence
//!
//! Persistent per-queue tuning with:
//! - Atomic file writes (temp file + rename)
//! - Schema validation with defaults
//! - Corruption fallback (log and return defaults)
//!
//! Storage location: {data_dir}/worker-settings.json

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::queue::{BackoffStrategy, RetryPolicy};
use crate::core::jobs::WorkerConfig;
use crate::core::CoreResult;

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "worker-settings.json";

fn default_version() -> u32 {
    SETTINGS_VERSION
}

// =============================================================================
// Queue Tuning
// =============================================================================

/// Tuning knobs for one queue's worker engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueTuning {
    /// Simultaneous handler invocations
    pub concurrency: usize,
    /// Total attempts before dead-lettering
    pub max_attempts: u32,
    /// Claim poll interval when the queue is empty, in milliseconds
    pub idle_backoff_ms: u64,
    /// Buffered progress updates per job
    pub progress_buffer: usize,
    /// Base retry delay in seconds (exponential)
    pub retry_base_delay_sec: u64,
}

impl Default for QueueTuning {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_attempts: 3,
            idle_backoff_ms: 250,
            progress_buffer: 32,
            retry_base_delay_sec: 2,
        }
    }
}

impl QueueTuning {
    /// Tuning for light job kinds that can run two at a time
    fn light() -> Self {
        Self {
            concurrency: 2,
            ..Default::default()
        }
    }

    /// Tuning for locally-executed, CPU-bound kinds (e.g. an on-device
    /// preview model): one slot per core, minimum two
    pub fn cpu_bound() -> Self {
        Self {
            concurrency: num_cpus::get().max(2),
            ..Default::default()
        }
    }

    /// Builds the engine config for this tuning
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::with_concurrency(self.concurrency)
            .with_idle_backoff(Duration::from_millis(self.idle_backoff_ms))
            .with_progress_buffer(self.progress_buffer)
    }

    /// Builds the retry policy for this tuning
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
            .with_backoff(BackoffStrategy::exponential(self.retry_base_delay_sec))
    }
}

// =============================================================================
// Worker Settings
// =============================================================================

/// Per-queue worker configuration owned by the embedding application.
/// Generation-heavy kinds default to a single slot; lighter kinds to two.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Image generation tuning
    #[serde(default = "QueueTuning::light")]
    pub image: QueueTuning,

    /// Video generation tuning
    #[serde(default)]
    pub video: QueueTuning,

    /// Widget generation tuning
    #[serde(default = "QueueTuning::light")]
    pub widget: QueueTuning,

    /// LoRA training tuning
    #[serde(default)]
    pub lora: QueueTuning,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            image: QueueTuning::light(),
            video: QueueTuning::default(),
            widget: QueueTuning::light(),
            lora: QueueTuning::default(),
        }
    }
}

impl WorkerSettings {
    /// Loads settings from a data directory, falling back to defaults when
    /// the file is missing or unreadable
    pub fn load_or_default(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);

        if !path.exists() {
            info!(path = %path.display(), "No worker settings file, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    if settings.version > SETTINGS_VERSION {
                        warn!(
                            found = settings.version,
                            supported = SETTINGS_VERSION,
                            "Worker settings from a newer schema, clamping version"
                        );
                        settings.version = SETTINGS_VERSION;
                    }
                    settings
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt worker settings, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read worker settings, using defaults");
                Self::default()
            }
        }
    }

    /// Saves settings atomically (temp file + rename)
    pub fn save(&self, data_dir: &Path) -> CoreResult<()> {
        fs::create_dir_all(data_dir)?;

        let path = data_dir.join(SETTINGS_FILE);
        let tmp_path = data_dir.join(format!("{SETTINGS_FILE}.tmp"));

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &path)?;

        info!(path = %path.display(), "Worker settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_kind_weights() {
        let settings = WorkerSettings::default();

        // Heavy kinds get one slot, light kinds two
        assert_eq!(settings.image.concurrency, 2);
        assert_eq!(settings.video.concurrency, 1);
        assert_eq!(settings.widget.concurrency, 2);
        assert_eq!(settings.lora.concurrency, 1);
        assert_eq!(settings.video.max_attempts, 3);
    }

    #[test]
    fn test_cpu_bound_tuning_scales_with_cores() {
        let tuning = QueueTuning::cpu_bound();
        assert!(tuning.concurrency >= 2);
    }

    #[test]
    fn test_tuning_builds_worker_config() {
        let tuning = QueueTuning {
            concurrency: 4,
            max_attempts: 5,
            idle_backoff_ms: 100,
            progress_buffer: 16,
            retry_base_delay_sec: 1,
        };

        let config = tuning.worker_config();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.idle_backoff, Duration::from_millis(100));
        assert_eq!(config.progress_buffer, 16);

        let policy = tuning.retry_policy();
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let mut settings = WorkerSettings::default();
        settings.video.max_attempts = 7;
        settings.save(dir.path()).unwrap();

        let loaded = WorkerSettings::load_or_default(dir.path());
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = WorkerSettings::load_or_default(dir.path());
        assert_eq!(loaded, WorkerSettings::default());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();

        let loaded = WorkerSettings::load_or_default(dir.path());
        assert_eq!(loaded, WorkerSettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"video": {"concurrency": 3}}"#,
        )
        .unwrap();

        let loaded = WorkerSettings::load_or_default(dir.path());
        assert_eq!(loaded.version, SETTINGS_VERSION);
        assert_eq!(loaded.video.concurrency, 3);
        // Unspecified fields inside the partial object fall back too
        assert_eq!(loaded.video.max_attempts, 3);
        assert_eq!(loaded.image.concurrency, 2);
    }
}
