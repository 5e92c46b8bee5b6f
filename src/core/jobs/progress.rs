//! Progress Side-Channel
//!
//! Bounded, non-blocking conduit between a running handler and the queue
//! transport's progress-tracking facility. A slow or failing sink must
//! never stall generation work, so the buffer drops its oldest update
//! under pressure and forwarding errors are absorbed by the worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::core::ProgressUpdate;

/// Default number of buffered updates per job
pub const DEFAULT_PROGRESS_BUFFER: usize = 32;

struct ProgressShared {
    buffer: Mutex<VecDeque<ProgressUpdate>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl ProgressShared {
    fn pop(&self) -> Option<ProgressUpdate> {
        self.buffer.lock().unwrap().pop_front()
    }
}

// =============================================================================
// Reporter (handler side)
// =============================================================================

/// Handle a handler uses to report progress at milestones.
///
/// `report` never blocks and never fails; percent values are clamped to
/// 0–100 and nothing assumes they are monotonic.
#[derive(Clone)]
pub struct ProgressReporter {
    shared: Arc<ProgressShared>,
}

impl ProgressReporter {
    /// Pushes a progress update; drops the oldest buffered update if the
    /// channel is full
    pub fn report(&self, percent: u8, message: impl Into<String>) {
        if self.shared.closed.load(Ordering::Acquire) {
            return;
        }

        let update = ProgressUpdate::new(percent, message);
        {
            let mut buffer = self.shared.buffer.lock().unwrap();
            if buffer.len() >= self.shared.capacity {
                buffer.pop_front();
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
            buffer.push_back(update);
        }
        self.shared.notify.notify_one();
    }
}

// =============================================================================
// Channel (worker side)
// =============================================================================

/// Per-job progress buffer owned by the worker slot
pub struct ProgressChannel {
    shared: Arc<ProgressShared>,
}

impl ProgressChannel {
    /// Creates a channel buffering at most `capacity` updates
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(ProgressShared {
                buffer: Mutex::new(VecDeque::new()),
                capacity: capacity.max(1),
                notify: Notify::new(),
                closed: AtomicBool::new(false),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Creates the reporter handed to the handler
    pub fn reporter(&self) -> ProgressReporter {
        ProgressReporter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Marks the channel closed; `recv` drains what is buffered then ends
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_one();
    }

    /// Receives the next buffered update, or `None` once the channel is
    /// closed and drained
    pub async fn recv(&self) -> Option<ProgressUpdate> {
        loop {
            let notified = self.shared.notify.notified();

            if let Some(update) = self.shared.pop() {
                return Some(update);
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return None;
            }

            notified.await;
        }
    }

    /// Updates discarded because the buffer was full
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_flow_through_in_order() {
        let channel = ProgressChannel::new(8);
        let reporter = channel.reporter();

        reporter.report(10, "claimed");
        reporter.report(60, "generating");
        channel.close();

        assert_eq!(channel.recv().await.unwrap().percent, 10);
        assert_eq!(channel.recv().await.unwrap().percent, 60);
        assert!(channel.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_drops_oldest_under_pressure() {
        let channel = ProgressChannel::new(2);
        let reporter = channel.reporter();

        reporter.report(10, "a");
        reporter.report(20, "b");
        reporter.report(30, "c");
        reporter.report(40, "d");
        channel.close();

        // Oldest updates were discarded, newest survive
        assert_eq!(channel.recv().await.unwrap().percent, 30);
        assert_eq!(channel.recv().await.unwrap().percent, 40);
        assert!(channel.recv().await.is_none());
        assert_eq!(channel.dropped_count(), 2);
    }

    #[tokio::test]
    async fn test_non_monotonic_percents_are_accepted() {
        let channel = ProgressChannel::new(8);
        let reporter = channel.reporter();

        reporter.report(80, "almost");
        reporter.report(20, "regression");
        channel.close();

        assert_eq!(channel.recv().await.unwrap().percent, 80);
        assert_eq!(channel.recv().await.unwrap().percent, 20);
    }

    #[tokio::test]
    async fn test_report_after_close_is_dropped() {
        let channel = ProgressChannel::new(8);
        let reporter = channel.reporter();

        channel.close();
        reporter.report(50, "late");

        assert!(channel.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_recv_wakes_on_report() {
        let channel = Arc::new(ProgressChannel::new(8));
        let reporter = channel.reporter();

        let receiver = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.recv().await })
        };

        tokio::task::yield_now().await;
        reporter.report(5, "started");

        let received = receiver.await.unwrap().unwrap();
        assert_eq!(received.percent, 5);
    }
}
