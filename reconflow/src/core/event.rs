//! Scheduler lifecycle events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RecordFlags, ResourceId, StageKind};

/// An event emitted by the scheduler as pipelines progress.
///
/// The core never touches presentation state; observers subscribe to these
/// through an [`EventSink`](crate::events::EventSink) and render them however
/// they like (tree views, progress bars, logs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// What happened.
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// The typed payload of a [`WorkflowEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A pipeline was appended to the scheduler queue.
    PipelineEnqueued {
        /// Identity of the pipeline.
        pipeline_id: Uuid,
        /// Number of stage entries queued.
        stage_count: usize,
    },
    /// The active stage task was started.
    StageStarted {
        /// Owning pipeline.
        pipeline_id: Uuid,
        /// Stage record the task executes for.
        resource_id: ResourceId,
        /// Stage kind.
        kind: StageKind,
    },
    /// The active stage task reported progress.
    StageProgressed {
        /// Owning pipeline.
        pipeline_id: Uuid,
        /// Stage record the task executes for.
        resource_id: ResourceId,
        /// Stage kind.
        kind: StageKind,
        /// Completion ratio in `[0, 1]`, exactly as the task reported it.
        ratio: f32,
    },
    /// The active stage task finished and the entry was dequeued.
    StageCompleted {
        /// Owning pipeline.
        pipeline_id: Uuid,
        /// Stage record the task executed for.
        resource_id: ResourceId,
        /// Stage kind.
        kind: StageKind,
        /// Flags written (or attempted) on the record.
        flags: RecordFlags,
        /// Whether the store accepted the flag update.
        persisted: bool,
    },
    /// The active stage task failed, or its configuration could not be
    /// resolved; the owning pipeline is abandoned.
    StageFailed {
        /// Owning pipeline.
        pipeline_id: Uuid,
        /// Stage record the failure occurred for.
        resource_id: ResourceId,
        /// Stage kind.
        kind: StageKind,
        /// Failure description.
        reason: String,
    },
    /// Every entry of a pipeline completed; its intermediate directory
    /// was removed.
    PipelineCompleted {
        /// Identity of the pipeline.
        pipeline_id: Uuid,
    },
    /// A pipeline was discarded after a stage failure; its intermediate
    /// directory is retained for diagnostics.
    PipelineAborted {
        /// Identity of the pipeline.
        pipeline_id: Uuid,
    },
}

impl WorkflowEvent {
    fn now(payload: EventPayload) -> Self {
        Self {
            timestamp: crate::utils::iso_timestamp(),
            payload,
        }
    }

    /// Creates a "pipeline.enqueued" event.
    #[must_use]
    pub fn pipeline_enqueued(pipeline_id: Uuid, stage_count: usize) -> Self {
        Self::now(EventPayload::PipelineEnqueued {
            pipeline_id,
            stage_count,
        })
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn stage_started(pipeline_id: Uuid, resource_id: ResourceId, kind: StageKind) -> Self {
        Self::now(EventPayload::StageStarted {
            pipeline_id,
            resource_id,
            kind,
        })
    }

    /// Creates a "stage.progressed" event.
    #[must_use]
    pub fn stage_progressed(
        pipeline_id: Uuid,
        resource_id: ResourceId,
        kind: StageKind,
        ratio: f32,
    ) -> Self {
        Self::now(EventPayload::StageProgressed {
            pipeline_id,
            resource_id,
            kind,
            ratio,
        })
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn stage_completed(
        pipeline_id: Uuid,
        resource_id: ResourceId,
        kind: StageKind,
        flags: RecordFlags,
        persisted: bool,
    ) -> Self {
        Self::now(EventPayload::StageCompleted {
            pipeline_id,
            resource_id,
            kind,
            flags,
            persisted,
        })
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn stage_failed(
        pipeline_id: Uuid,
        resource_id: ResourceId,
        kind: StageKind,
        reason: impl Into<String>,
    ) -> Self {
        Self::now(EventPayload::StageFailed {
            pipeline_id,
            resource_id,
            kind,
            reason: reason.into(),
        })
    }

    /// Creates a "pipeline.completed" event.
    #[must_use]
    pub fn pipeline_completed(pipeline_id: Uuid) -> Self {
        Self::now(EventPayload::PipelineCompleted { pipeline_id })
    }

    /// Creates a "pipeline.aborted" event.
    #[must_use]
    pub fn pipeline_aborted(pipeline_id: Uuid) -> Self {
        Self::now(EventPayload::PipelineAborted { pipeline_id })
    }

    /// Dotted event type string (e.g. "stage.started"), for filtering.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self.payload {
            EventPayload::PipelineEnqueued { .. } => "pipeline.enqueued",
            EventPayload::StageStarted { .. } => "stage.started",
            EventPayload::StageProgressed { .. } => "stage.progressed",
            EventPayload::StageCompleted { .. } => "stage.completed",
            EventPayload::StageFailed { .. } => "stage.failed",
            EventPayload::PipelineCompleted { .. } => "pipeline.completed",
            EventPayload::PipelineAborted { .. } => "pipeline.aborted",
        }
    }

    /// The progress ratio, for "stage.progressed" events.
    #[must_use]
    pub fn ratio(&self) -> Option<f32> {
        match self.payload {
            EventPayload::StageProgressed { ratio, .. } => Some(ratio),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let id = Uuid::new_v4();
        assert_eq!(
            WorkflowEvent::pipeline_enqueued(id, 3).event_type(),
            "pipeline.enqueued"
        );
        assert_eq!(
            WorkflowEvent::stage_started(id, 1, StageKind::FeatureMatch).event_type(),
            "stage.started"
        );
        assert_eq!(
            WorkflowEvent::pipeline_aborted(id).event_type(),
            "pipeline.aborted"
        );
    }

    #[test]
    fn test_event_timestamp_populated() {
        let event = WorkflowEvent::pipeline_completed(Uuid::new_v4());
        assert!(event.timestamp.contains('T'));
    }

    #[test]
    fn test_event_ratio_accessor() {
        let id = Uuid::new_v4();
        let event = WorkflowEvent::stage_progressed(id, 2, StageKind::PointCloud, 0.25);
        assert_eq!(event.ratio(), Some(0.25));

        let other = WorkflowEvent::stage_started(id, 2, StageKind::PointCloud);
        assert_eq!(other.ratio(), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = WorkflowEvent::stage_completed(
            Uuid::new_v4(),
            7,
            StageKind::PhotoOrientation,
            RecordFlags::COMPLETED | RecordFlags::GEOREFERENCED,
            true,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"stage_completed""#));

        let deserialized: WorkflowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.payload, event.payload);
    }
}
