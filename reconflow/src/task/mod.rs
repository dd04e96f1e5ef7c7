//! The stage task polling contract.
//!
//! A stage task is an opaque long-running computation. The scheduler
//! never blocks on one; it starts the task once and observes it through
//! `state()`/`completion_ratio()` on every poll tick. Implementations
//! run their work on their own threads and publish state through atomics
//! or locks, so the contract must be callable from the polling thread at
//! any time.

use uuid::Uuid;

use crate::config::StageConfig;
use crate::core::{ResourceId, ResultFlags, StageKind, TaskState};

/// One stage's executor.
pub trait StageTask: Send + Sync {
    /// Begins execution. Called exactly once per task instance, with the
    /// configuration resolved for its stage entry.
    fn start(&self, config: &StageConfig);

    /// Current execution state.
    fn state(&self) -> TaskState;

    /// Completion ratio in `[0, 1]`; meaningful while working or
    /// finished. Conforming tasks report non-decreasing values.
    fn completion_ratio(&self) -> f32;

    /// Stage-specific result bits, meaningful once finished. Photo
    /// orientation sets [`ResultFlags::GEOREFERENCE`] when it produced a
    /// georeference transform.
    fn result_code(&self) -> ResultFlags;
}

/// Constructs the executor for a resolved configuration.
///
/// Embedders provide factories that spawn real computations; the
/// [`testing`](crate::testing) module ships a scripted one.
pub trait TaskFactory: Send + Sync {
    /// Creates the task matching `config`'s stage kind.
    fn make_task(&self, config: &StageConfig) -> Box<dyn StageTask>;
}

/// The single in-flight stage task and everything needed to drive it.
pub struct ActiveTask {
    /// The pipeline the task belongs to.
    pub pipeline_id: Uuid,
    /// The stage record the task executes for.
    pub resource_id: ResourceId,
    /// The entry's stage kind.
    pub kind: StageKind,
    /// The resolved configuration, handed to the task when its READY
    /// state is first observed.
    pub config: StageConfig,
    /// The executor.
    pub task: Box<dyn StageTask>,
}

impl ActiveTask {
    /// Current state of the underlying task.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.task.state()
    }
}

impl std::fmt::Debug for ActiveTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTask")
            .field("pipeline_id", &self.pipeline_id)
            .field("resource_id", &self.resource_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
