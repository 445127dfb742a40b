//! Inbox queue — unbounded FIFO hand-off from the HTTP front door to the worker.
//!
//! The producer side ([`ActivitySender`]) is cheap to clone and never blocks.
//! The consumer side ([`ActivityReceiver`]) is unique, so only one worker can
//! drain the queue. Every dequeued [`QueueItem`] must be acknowledged; the
//! pending count that backs [`ActivitySender::wait_drained`] only drops on
//! acknowledgement.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, mpsc};
use tracing::debug;
use uuid::Uuid;

use crate::activitypub::InboundActivity;
use crate::error::QueueError;

struct QueueState {
    /// Enqueued but not yet acknowledged.
    pending: AtomicUsize,
    drained: Notify,
}

impl QueueState {
    fn complete_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Create a connected sender/receiver pair.
pub fn inbox_queue() -> (ActivitySender, ActivityReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(QueueState {
        pending: AtomicUsize::new(0),
        drained: Notify::new(),
    });
    (
        ActivitySender {
            tx,
            state: Arc::clone(&state),
        },
        ActivityReceiver { rx },
    )
}

/// An activity waiting for (or undergoing) processing.
pub struct QueueItem {
    pub id: Uuid,
    pub enqueued_at: DateTime<Utc>,
    activity: InboundActivity,
    state: Arc<QueueState>,
}

impl QueueItem {
    pub fn activity(&self) -> &InboundActivity {
        &self.activity
    }

    /// Mark this item as fully processed.
    pub fn ack(self) {
        debug!(item = %self.id, "Queue item acknowledged");
        self.state.complete_one();
    }
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueItem")
            .field("id", &self.id)
            .field("enqueued_at", &self.enqueued_at)
            .field("activity", &self.activity.id())
            .finish()
    }
}

/// Producer handle.
#[derive(Clone)]
pub struct ActivitySender {
    tx: mpsc::UnboundedSender<QueueItem>,
    state: Arc<QueueState>,
}

impl ActivitySender {
    /// Enqueue an activity. Never blocks; fails only once the receiver is gone.
    pub fn enqueue(&self, activity: InboundActivity) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        let item = QueueItem {
            id,
            enqueued_at: Utc::now(),
            activity,
            state: Arc::clone(&self.state),
        };

        self.state.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(item).is_err() {
            self.state.complete_one();
            return Err(QueueError::Closed);
        }
        Ok(id)
    }

    /// Items enqueued but not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Wait until every enqueued item has been acknowledged.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.state.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Result of a bounded wait on the queue.
#[derive(Debug)]
pub enum Dequeued {
    Item(QueueItem),
    /// Nothing arrived within the timeout.
    Empty,
    /// Every sender has been dropped and the queue is empty.
    Closed,
}

/// Consumer handle. Deliberately not `Clone`.
pub struct ActivityReceiver {
    rx: mpsc::UnboundedReceiver<QueueItem>,
}

impl ActivityReceiver {
    /// Wait up to `timeout` for the next item.
    pub async fn dequeue(&mut self, timeout: Duration) -> Dequeued {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(item)) => Dequeued::Item(item),
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity() -> InboundActivity {
        InboundActivity::Other
    }

    #[tokio::test]
    async fn fifo_order() {
        let (tx, mut rx) = inbox_queue();
        let a = tx.enqueue(activity()).unwrap();
        let b = tx.enqueue(activity()).unwrap();

        let Dequeued::Item(first) = rx.dequeue(Duration::from_millis(50)).await else {
            panic!("expected item");
        };
        let Dequeued::Item(second) = rx.dequeue(Duration::from_millis(50)).await else {
            panic!("expected item");
        };
        assert_eq!(first.id, a);
        assert_eq!(second.id, b);
    }

    #[tokio::test]
    async fn empty_queue_times_out() {
        let (_tx, mut rx) = inbox_queue();
        let started = std::time::Instant::now();
        assert!(matches!(
            rx.dequeue(Duration::from_millis(20)).await,
            Dequeued::Empty
        ));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn closed_when_senders_dropped() {
        let (tx, mut rx) = inbox_queue();
        drop(tx);
        assert!(matches!(
            rx.dequeue(Duration::from_secs(5)).await,
            Dequeued::Closed
        ));
    }

    #[tokio::test]
    async fn enqueue_fails_after_receiver_dropped() {
        let (tx, rx) = inbox_queue();
        drop(rx);
        assert!(matches!(tx.enqueue(activity()), Err(QueueError::Closed)));
        assert_eq!(tx.pending(), 0);
    }

    #[tokio::test]
    async fn pending_tracks_acknowledgement() {
        let (tx, mut rx) = inbox_queue();
        tx.enqueue(activity()).unwrap();
        tx.enqueue(activity()).unwrap();
        assert_eq!(tx.pending(), 2);

        let Dequeued::Item(item) = rx.dequeue(Duration::from_millis(50)).await else {
            panic!("expected item");
        };
        // Dequeue alone does not complete the item.
        assert_eq!(tx.pending(), 2);
        item.ack();
        assert_eq!(tx.pending(), 1);
    }

    #[tokio::test]
    async fn wait_drained_returns_after_last_ack() {
        let (tx, mut rx) = inbox_queue();
        tx.enqueue(activity()).unwrap();
        tx.enqueue(activity()).unwrap();

        let consumer = tokio::spawn(async move {
            while let Dequeued::Item(item) = rx.dequeue(Duration::from_millis(200)).await {
                tokio::time::sleep(Duration::from_millis(10)).await;
                item.ack();
            }
        });

        tokio::time::timeout(Duration::from_secs(2), tx.wait_drained())
            .await
            .expect("queue should drain");
        assert_eq!(tx.pending(), 0);
        consumer.abort();
    }

    #[tokio::test]
    async fn wait_drained_on_empty_queue_is_immediate() {
        let (tx, _rx) = inbox_queue();
        tokio::time::timeout(Duration::from_millis(100), tx.wait_drained())
            .await
            .expect("nothing to wait for");
    }
}
