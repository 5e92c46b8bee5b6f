//! Processor Registry
//!
//! Explicit context object owning the lifecycle of every worker engine in
//! a process. Constructed once at startup and passed to whatever needs to
//! register or inspect processors; there is no ambient global table, so
//! tests can build and tear down registries freely.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::core::{CoreError, CoreResult, QueueName};

use super::{ProcessorHandle, Shutdown};

/// Process-wide table of queue name → worker engine
pub struct ProcessorRegistry {
    processors: Mutex<HashMap<QueueName, Arc<dyn ProcessorHandle>>>,
    started: AtomicBool,
    shutdown: Arc<Shutdown>,
    handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl ProcessorRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            processors: Mutex::new(HashMap::new()),
            started: AtomicBool::new(false),
            shutdown: Arc::new(Shutdown::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Registers a worker engine under its queue name.
    ///
    /// Before `start_all`, registering the same queue again replaces the
    /// previous engine. Once consumption has started the table is frozen
    /// and re-registration is an error.
    pub fn register(&self, processor: Arc<dyn ProcessorHandle>) -> CoreResult<()> {
        let queue_name = processor.queue_name().to_string();

        if self.is_started() {
            return Err(CoreError::ProcessorAlreadyStarted(queue_name));
        }

        let mut processors = self.processors.lock().unwrap();
        if processors.insert(queue_name.clone(), processor).is_some() {
            info!(queue = %queue_name, "Replaced registered processor");
        } else {
            info!(queue = %queue_name, "Registered processor");
        }
        Ok(())
    }

    /// Starts consumption on every registered engine.
    ///
    /// Idempotent: a second call does not spawn a second set of slot
    /// loops.
    pub fn start_all(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("start_all called twice, ignoring");
            return;
        }

        let processors = self.processors.lock().unwrap();
        let mut handles = self.handles.lock().unwrap();

        for (queue_name, processor) in processors.iter() {
            let spawned = processor.start(Arc::clone(&self.shutdown));
            info!(
                queue = %queue_name,
                slots = spawned.len(),
                "Processor started"
            );
            handles.extend(spawned);
        }
    }

    /// Whether `start_all` has run
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Number of registered processors
    pub fn processor_count(&self) -> usize {
        self.processors.lock().unwrap().len()
    }

    /// Registered queue names
    pub fn queue_names(&self) -> Vec<QueueName> {
        self.processors.lock().unwrap().keys().cloned().collect()
    }

    /// Looks up a registered processor
    pub fn get(&self, queue_name: &str) -> Option<Arc<dyn ProcessorHandle>> {
        self.processors.lock().unwrap().get(queue_name).cloned()
    }

    /// Requests cooperative shutdown of all slot loops
    pub fn shutdown(&self) {
        info!("Registry shutdown requested");
        self.shutdown.trigger();
    }

    /// Awaits every spawned slot loop after `shutdown`
    pub async fn join(&self) {
        let handles = {
            let mut guard = self.handles.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
