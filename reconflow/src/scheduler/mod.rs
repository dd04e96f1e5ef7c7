//! The pipeline scheduler.
//!
//! Owns the FIFO of queued pipelines and drives exactly one stage task
//! at a time through a cooperative poll loop. A tick never blocks on a
//! task: it observes the active task's state, reacts, and returns.
//! Dispatch is two-phase: the tick that resolves a configuration only
//! constructs the task; the task is started on the next tick, when its
//! READY state is first observed.

#[cfg(test)]
mod scheduler_tests;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ConfigResolver;
use crate::core::{RecordFlags, ResultFlags, StageKind, TaskState, WorkflowEvent};
use crate::events::{EventSink, NoOpEventSink};
use crate::pipeline::Pipeline;
use crate::settings::ProcessSettings;
use crate::store::ResourceStore;
use crate::task::{ActiveTask, TaskFactory};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The queue is empty; callers may stop polling.
    Idle,
    /// A stage configuration was resolved and its task constructed; the
    /// task starts on the next tick.
    Dispatched,
    /// The active task was started.
    Started,
    /// The active task reported this completion ratio.
    Progressed(f32),
    /// The active task finished and its entry was dequeued.
    StageCompleted,
    /// A pipeline was abandoned after a failure.
    PipelineAborted,
    /// A pipeline's last entry completed; the pipeline was dequeued and
    /// its intermediate directory removed.
    PipelineCompleted,
}

/// Drives queued pipelines, one stage task at a time.
pub struct Scheduler {
    store: Arc<dyn ResourceStore>,
    factory: Box<dyn TaskFactory>,
    resolver: ConfigResolver,
    sink: Arc<dyn EventSink>,
    settings: ProcessSettings,
    queue: VecDeque<Pipeline>,
    active: Option<ActiveTask>,
}

impl Scheduler {
    /// Creates a scheduler with default settings and no event sink.
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, factory: Box<dyn TaskFactory>) -> Self {
        let settings = ProcessSettings::default();
        let resolver = ConfigResolver::new(store.clone(), settings.worker_threads);
        Self {
            store,
            factory,
            resolver,
            sink: Arc::new(NoOpEventSink),
            settings,
            queue: VecDeque::new(),
            active: None,
        }
    }

    /// Replaces the process settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ProcessSettings) -> Self {
        self.resolver = ConfigResolver::new(self.store.clone(), settings.worker_threads);
        self.settings = settings;
        self
    }

    /// Attaches an event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The scheduler's settings.
    #[must_use]
    pub const fn settings(&self) -> &ProcessSettings {
        &self.settings
    }

    /// Whether nothing is queued or running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active.is_none()
    }

    /// Number of queued pipelines, the one being executed included.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether a stage task is currently held.
    #[must_use]
    pub fn has_active_task(&self) -> bool {
        self.active.is_some()
    }

    /// Appends a pipeline to the queue.
    ///
    /// The scheduler does not poll by itself; the caller keeps invoking
    /// [`tick`](Self::tick) on a cadence, or hands the scheduler to
    /// [`run`](Self::run).
    pub fn enqueue(&mut self, pipeline: Pipeline) {
        info!(pipeline_id = %pipeline.id(), stages = pipeline.len(), "Pipeline enqueued");
        self.sink
            .try_emit(WorkflowEvent::pipeline_enqueued(pipeline.id(), pipeline.len()));
        self.queue.push_back(pipeline);
    }

    /// Executes one poll step.
    pub fn tick(&mut self) -> TickOutcome {
        if self.active.is_some() {
            self.poll_active()
        } else {
            self.dispatch_next()
        }
    }

    /// Drives [`tick`](Self::tick) from a fixed interval until the queue
    /// drains.
    ///
    /// Suspension points are only the interval waits; a tick itself
    /// never awaits anything.
    pub async fn run(&mut self, poll_interval: Duration) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if self.tick() == TickOutcome::Idle {
                debug!("Queue drained; stopping poll loop");
                return;
            }
        }
    }

    /// Takes the head pipeline's head entry, resolves its configuration,
    /// and constructs its task. On resolution failure the pipeline is
    /// aborted without a task ever existing.
    fn dispatch_next(&mut self) -> TickOutcome {
        loop {
            let Some(pipeline) = self.queue.front() else {
                return TickOutcome::Idle;
            };
            let pipeline_id = pipeline.id();
            let Some(entry) = pipeline.front().cloned() else {
                // A pipeline with no entries should never be enqueued;
                // drop it rather than stall the queue.
                debug!(%pipeline_id, "Discarding drained pipeline");
                self.queue.pop_front();
                continue;
            };
            let intermediate_dir = pipeline.intermediate_dir().to_path_buf();

            let resource_id = entry.resource_id;
            let kind = entry.kind();

            match self.resolver.resolve(&entry, &intermediate_dir) {
                Ok(config) => {
                    let task = self.factory.make_task(&config);
                    info!(%pipeline_id, resource_id, %kind, "Stage dispatched");
                    self.active = Some(ActiveTask {
                        pipeline_id,
                        resource_id,
                        kind,
                        config,
                        task,
                    });
                    return TickOutcome::Dispatched;
                }
                Err(err) => {
                    error!(%pipeline_id, resource_id, %kind, error = %err,
                        "Configuration resolution failed; aborting pipeline");
                    self.sink.try_emit(WorkflowEvent::stage_failed(
                        pipeline_id,
                        resource_id,
                        kind,
                        err.to_string(),
                    ));
                    self.queue.pop_front();
                    self.sink
                        .try_emit(WorkflowEvent::pipeline_aborted(pipeline_id));
                    return TickOutcome::PipelineAborted;
                }
            }
        }
    }

    fn poll_active(&mut self) -> TickOutcome {
        let Some(active) = self.active.as_ref() else {
            return TickOutcome::Idle;
        };
        let (pipeline_id, resource_id, kind) =
            (active.pipeline_id, active.resource_id, active.kind);

        match active.state() {
            TaskState::Ready => {
                active.task.start(&active.config);
                info!(%pipeline_id, resource_id, %kind, "Stage started");
                self.sink
                    .try_emit(WorkflowEvent::stage_started(pipeline_id, resource_id, kind));
                self.sink.try_emit(WorkflowEvent::stage_progressed(
                    pipeline_id,
                    resource_id,
                    kind,
                    0.0,
                ));
                TickOutcome::Started
            }
            TaskState::Working => {
                let ratio = active.task.completion_ratio();
                debug!(%pipeline_id, resource_id, %kind, ratio, "Stage progressed");
                self.sink.try_emit(WorkflowEvent::stage_progressed(
                    pipeline_id,
                    resource_id,
                    kind,
                    ratio,
                ));
                TickOutcome::Progressed(ratio)
            }
            TaskState::Error => self.abort_pipeline(),
            TaskState::Finished => self.complete_stage(),
        }
    }

    /// Abandons the head pipeline after its active task failed. All
    /// remaining entries are discarded unexecuted and the intermediate
    /// directory stays on disk for diagnostics.
    fn abort_pipeline(&mut self) -> TickOutcome {
        let Some(active) = self.active.take() else {
            return TickOutcome::Idle;
        };
        error!(pipeline_id = %active.pipeline_id, resource_id = active.resource_id,
            kind = %active.kind, "Stage task failed; aborting pipeline");

        self.sink.try_emit(WorkflowEvent::stage_failed(
            active.pipeline_id,
            active.resource_id,
            active.kind,
            "stage task reported an execution error",
        ));
        self.queue.pop_front();
        self.sink
            .try_emit(WorkflowEvent::pipeline_aborted(active.pipeline_id));
        TickOutcome::PipelineAborted
    }

    /// Persists a finished entry's completion flags and dequeues it;
    /// dequeues the whole pipeline when that was its last entry.
    fn complete_stage(&mut self) -> TickOutcome {
        let Some(active) = self.active.take() else {
            return TickOutcome::Idle;
        };
        let (pipeline_id, resource_id, kind) =
            (active.pipeline_id, active.resource_id, active.kind);

        self.sink.try_emit(WorkflowEvent::stage_progressed(
            pipeline_id,
            resource_id,
            kind,
            1.0,
        ));

        let mut flags = RecordFlags::COMPLETED;
        if kind == StageKind::PhotoOrientation
            && active.task.result_code().contains(ResultFlags::GEOREFERENCE)
        {
            flags |= RecordFlags::GEOREFERENCED;
        }

        let persisted = match self.store.update_stage_flags(kind, resource_id, flags) {
            Ok(()) => true,
            Err(err) => {
                // The work itself succeeded; the entry completes either
                // way and the event records the gap.
                warn!(%pipeline_id, resource_id, %kind, error = %err,
                    "Completion flag update failed");
                false
            }
        };

        info!(%pipeline_id, resource_id, %kind, persisted, "Stage completed");
        self.sink.try_emit(WorkflowEvent::stage_completed(
            pipeline_id,
            resource_id,
            kind,
            flags,
            persisted,
        ));

        let pipeline_drained = match self.queue.front_mut() {
            Some(pipeline) => {
                pipeline.pop_front();
                pipeline.is_empty()
            }
            None => false,
        };

        if pipeline_drained {
            if let Some(pipeline) = self.queue.pop_front() {
                if let Err(err) = std::fs::remove_dir_all(pipeline.intermediate_dir()) {
                    warn!(%pipeline_id, path = %pipeline.intermediate_dir().display(),
                        error = %err, "Failed to remove intermediate directory");
                }
                info!(%pipeline_id, "Pipeline completed");
                self.sink
                    .try_emit(WorkflowEvent::pipeline_completed(pipeline.id()));
            }
            return TickOutcome::PipelineCompleted;
        }

        TickOutcome::StageCompleted
    }
}
