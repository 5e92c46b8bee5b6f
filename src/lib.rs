//! Atelier Job-Processing Core
//!
//! Executes the long-running AI generation work of the Atelier canvas —
//! image generation, video generation, widget synthesis, and LoRA model
//! training — outside the request/response path.
//!
//! The web tier enqueues typed job payloads onto named queues; this crate
//! claims them with bounded concurrency, drives the type-specific handler,
//! streams progress back through the queue transport, and resolves every
//! job to a terminal outcome.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use atelier_lib::core::assets::InMemoryAssetStore;
//! use atelier_lib::core::generative::MockGenerativeProvider;
//! use atelier_lib::core::jobs::{
//!     ImageGenerationHandler, ProcessorRegistry, QueueWorker,
//! };
//! use atelier_lib::core::queue::{InMemoryQueue, QueueTransport};
//! use atelier_lib::core::settings::WorkerSettings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = WorkerSettings::default();
//! let provider = Arc::new(MockGenerativeProvider::new("mock"));
//! let assets = Arc::new(InMemoryAssetStore::new());
//!
//! let image_queue = Arc::new(InMemoryQueue::new(
//!     "ai:image",
//!     settings.image.retry_policy(),
//! ));
//!
//! let registry = ProcessorRegistry::new();
//! registry.register(Arc::new(QueueWorker::new(
//!     image_queue.clone() as Arc<dyn QueueTransport<_>>,
//!     Arc::new(ImageGenerationHandler::new(provider, assets)),
//!     settings.image.worker_config(),
//! )))?;
//!
//! registry.start_all();
//! # Ok(())
//! # }
//! ```

pub mod core;

use std::path::PathBuf;
use std::sync::OnceLock;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes tracing for an embedding process.
///
/// Logs to stdout and to a daily-rolling file under `log_dir` (falling
/// back to `.logs` in the working directory). Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging(log_dir: Option<PathBuf>) {
    let log_dir = log_dir.unwrap_or_else(|| PathBuf::from(".logs"));
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "atelier.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    // Avoid panics if already initialized (tests, repeated embeddings).
    let _ = tracing::subscriber::set_global_default(subscriber);
}
