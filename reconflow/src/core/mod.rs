//! Core domain types: stage kinds, task states, record flags, and
//! scheduler events.

mod event;
mod kind;
mod state;

pub use event::{EventPayload, WorkflowEvent};
pub use kind::{EntityKind, StageKind};
pub use state::{RecordFlags, ResultFlags, TaskState};

/// Identifier of a record inside the resource store.
///
/// Store identifiers are small integers assigned by the store itself;
/// pipelines are identified separately by [`Uuid`](uuid::Uuid).
pub type ResourceId = u32;
