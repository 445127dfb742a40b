//! Inbox worker — the single consumer draining the inbox queue.
//!
//! Items are handled one at a time in arrival order. A failing or panicking
//! handler is logged and counted; the loop always moves on to the next item.
//! Cancellation interrupts the dequeue wait immediately but never an item that
//! is already being handled.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::processor::{ActivityHandler, Outcome};
use super::queue::{ActivityReceiver, Dequeued, QueueItem};
use crate::error::PipelineError;

/// Worker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Processing,
}

/// Counters shared between the worker and whoever observes it.
#[derive(Debug, Default)]
pub struct WorkerStats {
    dequeued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    undelivered: AtomicU64,
    heartbeats: AtomicU64,
    processing: AtomicBool,
}

/// Point-in-time copy of [`WorkerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub state: WorkerState,
    pub dequeued: u64,
    /// Items handled without a fault, whether or not they produced a reply.
    pub completed: u64,
    /// Items abandoned because handling failed or panicked.
    pub failed: u64,
    /// Replies that were composed but not accepted by the remote inbox.
    pub undelivered: u64,
    /// Dequeue waits that timed out with nothing to do.
    pub heartbeats: u64,
}

impl WorkerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            state: if self.processing.load(Ordering::Acquire) {
                WorkerState::Processing
            } else {
                WorkerState::Idle
            },
            dequeued: self.dequeued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            undelivered: self.undelivered.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
        }
    }
}

pub struct InboxWorker {
    receiver: ActivityReceiver,
    handler: Arc<dyn ActivityHandler>,
    poll_timeout: Duration,
    stats: Arc<WorkerStats>,
}

impl InboxWorker {
    pub fn new(
        receiver: ActivityReceiver,
        handler: Arc<dyn ActivityHandler>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            receiver,
            handler,
            poll_timeout,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the loop on the runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Drain the queue until `cancel` fires or every producer is gone.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(poll_secs = self.poll_timeout.as_secs_f64(), "Inbox worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Inbox worker shutting down");
                    break;
                }
                next = self.receiver.dequeue(self.poll_timeout) => next,
            };

            match next {
                Dequeued::Item(item) => self.process(item).await,
                Dequeued::Empty => {
                    self.stats.heartbeats.fetch_add(1, Ordering::Relaxed);
                    debug!("Inbox worker idle");
                }
                Dequeued::Closed => {
                    info!("Inbox queue closed, worker exiting");
                    break;
                }
            }
        }
    }

    async fn process(&self, item: QueueItem) {
        self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        self.stats.processing.store(true, Ordering::Release);

        let activity_id = item.activity().id().unwrap_or("-").to_string();
        debug!(item = %item.id, activity = %activity_id, "Processing inbox item");

        let result = AssertUnwindSafe(self.handler.handle(item.activity()))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(&*payload))));

        match result {
            Ok(Outcome::Ignored(reason)) => {
                debug!(activity = %activity_id, reason = reason.label(), "Activity ignored");
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Outcome::Replied(delivery)) => {
                if !delivery.is_delivered() {
                    warn!(activity = %activity_id, outcome = ?delivery, "Reply not delivered");
                    self.stats.undelivered.fetch_add(1, Ordering::Relaxed);
                }
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!(
                    item = %item.id,
                    activity = %activity_id,
                    error = %e,
                    "Inbox item failed, abandoning"
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.stats.processing.store(false, Ordering::Release);
        item.ack();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
