//! Ingestion-and-relay pipeline.
//!
//! Every inbound activity flows through:
//! 1. `ActivitySender::enqueue()` — front door hand-off, never blocks
//! 2. `InboxWorker` — single consumer, FIFO, per-item fault containment
//! 3. `MentionFilter::evaluate()` — pure eligibility check and text extraction
//! 4. `Translator::translate()` — process-wide default target
//! 5. `ReplyComposer::compose()` and `DeliveryAttempter::deliver()`

pub mod compose;
pub mod delivery;
pub mod mention;
pub mod processor;
pub mod queue;
pub mod worker;

pub use compose::{ReplyActivity, ReplyComposer};
pub use delivery::{DeliveryAttempter, DeliveryOutcome};
pub use mention::{Eligibility, MentionFilter};
pub use processor::{ActivityHandler, IgnoreReason, MentionProcessor, Outcome};
pub use queue::{ActivityReceiver, ActivitySender, Dequeued, QueueItem, inbox_queue};
pub use worker::{InboxWorker, StatsSnapshot, WorkerState, WorkerStats};
