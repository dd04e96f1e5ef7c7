//! Channel-backed event sink for external consumers.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use super::EventSink;
use crate::core::WorkflowEvent;

/// An event sink that forwards events over a bounded channel.
///
/// The scheduler owns the sink half; a consumer (UI thread, log writer,
/// test harness) drains the receiver at its own pace. The queue is
/// bounded so a stalled consumer cannot exhaust memory; events that do
/// not fit are counted and dropped rather than blocking the poll loop.
pub struct ChannelEventSink {
    tx: mpsc::Sender<WorkflowEvent>,
    capacity: usize,
    dropped: AtomicU64,
}

impl ChannelEventSink {
    /// Creates a sink with a bounded queue and returns the receiving end.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let sink = Self {
            tx,
            capacity,
            dropped: AtomicU64::new(0),
        };
        (sink, rx)
    }

    /// Number of events discarded because the queue was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    fn record_drop(&self, event: &WorkflowEvent) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(
            event_type = %event.event_type(),
            dropped_total = %self.dropped(),
            "Event dropped: channel full or closed"
        );
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: WorkflowEvent) {
        if let Err(err) = self.tx.send(event).await {
            self.record_drop(&err.0);
        }
    }

    fn try_emit(&self, event: WorkflowEvent) {
        if let Err(err) = self.tx.try_send(event) {
            let event = match err {
                mpsc::error::TrySendError::Full(event)
                | mpsc::error::TrySendError::Closed(event) => event,
            };
            self.record_drop(&event);
        }
    }
}
