//! Event sinks for scheduler observability.
//!
//! The scheduler core never renders anything; it hands every lifecycle
//! change to an [`EventSink`]. Implementations here cover the common
//! cases: discard, structured logging, in-memory collection for tests,
//! and channel forwarding for external consumers.

mod channel;
mod sink;

pub use channel::ChannelEventSink;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
