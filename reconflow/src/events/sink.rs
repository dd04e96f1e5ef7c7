//! Event sink trait and implementations.

use async_trait::async_trait;
use tracing::{debug, info, Level};

use crate::core::WorkflowEvent;

/// Trait for event sinks that can receive scheduler events.
///
/// The scheduler emits a [`WorkflowEvent`] whenever a pipeline or stage
/// changes state; sinks decide what to do with it. A UI sink might update
/// a tree view, a logging sink writes structured log lines, a collecting
/// sink records events for assertions.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: WorkflowEvent);

    /// Tries to emit an event without blocking.
    ///
    /// This method must never panic. Delivery failures are logged
    /// but suppressed.
    fn try_emit(&self, event: WorkflowEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: WorkflowEvent) {
        // Intentionally empty - discards all events
    }

    fn try_emit(&self, _event: WorkflowEvent) {
        // Intentionally empty - discards all events
    }
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &WorkflowEvent) {
        let event_type = event.event_type();
        match self.level {
            Level::DEBUG => {
                debug!(
                    event_type = %event_type,
                    payload = ?event.payload,
                    "Event: {}", event_type
                );
            }
            _ => {
                info!(
                    event_type = %event_type,
                    payload = ?event.payload,
                    "Event: {}", event_type
                );
            }
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: WorkflowEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: WorkflowEvent) {
        self.log_event(&event);
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<WorkflowEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type matches a prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<WorkflowEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.event_type().starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: WorkflowEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: WorkflowEvent) {
        self.events.write().push(event);
    }
}
