use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use super::{Scheduler, TickOutcome};
use crate::core::{EntityKind, EventPayload, RecordFlags, ResultFlags, StageKind, WorkflowEvent};
use crate::events::CollectingEventSink;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::settings::ProcessSettings;
use crate::store::{MemoryStore, ResourceStore};
use crate::testing::{seed_survey, ScriptedFactory, ScriptedTask, SurveySeed};

struct TestBed {
    store: Arc<MemoryStore>,
    seed: SurveySeed,
    factory: Arc<ScriptedFactory>,
    sink: Arc<CollectingEventSink>,
    scheduler: Scheduler,
    scratch: tempfile::TempDir,
}

fn test_bed() -> TestBed {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_root("/workspace"));
    let seed = seed_survey(&store);
    let factory = Arc::new(ScriptedFactory::new());
    let sink = Arc::new(CollectingEventSink::new());
    let settings = ProcessSettings {
        intermediate_root: scratch.path().to_path_buf(),
        worker_threads: 2,
        poll_interval_ms: 1,
    };
    let scheduler = Scheduler::new(store.clone(), Box::new(factory.clone()))
        .with_settings(settings)
        .with_sink(sink.clone());
    TestBed {
        store,
        seed,
        factory,
        sink,
        scheduler,
        scratch,
    }
}

fn build_pipeline(bed: &TestBed, start: StageKind, end: StageKind) -> Pipeline {
    PipelineBuilder::new(bed.store.clone(), bed.scratch.path(), bed.seed.block_id)
        .stages(start, end)
        .build()
        .unwrap()
}

/// Ticks until the queue drains, returning every non-idle outcome.
fn drain(scheduler: &mut Scheduler) -> Vec<TickOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..128 {
        match scheduler.tick() {
            TickOutcome::Idle => return outcomes,
            outcome => outcomes.push(outcome),
        }
    }
    panic!("scheduler did not drain the queue");
}

fn event_types(sink: &CollectingEventSink) -> Vec<&'static str> {
    sink.events().iter().map(WorkflowEvent::event_type).collect()
}

#[test]
fn test_tick_is_idle_on_empty_queue() {
    let mut bed = test_bed();
    assert_eq!(bed.scheduler.tick(), TickOutcome::Idle);
    assert!(bed.scheduler.is_idle());
    assert!(bed.sink.is_empty());
}

#[test]
fn test_dispatch_constructs_before_starting() {
    let mut bed = test_bed();
    let handle = bed.factory.push_task(ScriptedTask::finishing(&[0.5]));
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::FeatureMatch);
    bed.scheduler.enqueue(pipeline);

    // First tick resolves the configuration and constructs the task only.
    assert_eq!(bed.scheduler.tick(), TickOutcome::Dispatched);
    assert!(bed.scheduler.has_active_task());
    assert_eq!(handle.start_count(), 0);

    // The next tick finds the task ready and starts it with the config it
    // was constructed from.
    assert_eq!(bed.scheduler.tick(), TickOutcome::Started);
    assert_eq!(handle.start_count(), 1);
    let config = handle.started_with().unwrap();
    assert_eq!(config.kind(), StageKind::FeatureMatch);

    assert_eq!(bed.scheduler.tick(), TickOutcome::Progressed(0.5));
}

#[test]
fn test_pipeline_runs_stages_in_order() {
    let mut bed = test_bed();
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::PhotoOrientation);
    let dir = pipeline.intermediate_dir().to_path_buf();
    assert!(dir.is_dir());
    bed.scheduler.enqueue(pipeline);

    let outcomes = drain(&mut bed.scheduler);
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Dispatched,
            TickOutcome::Started,
            TickOutcome::StageCompleted,
            TickOutcome::Dispatched,
            TickOutcome::Started,
            TickOutcome::PipelineCompleted,
        ]
    );

    // Each record got exactly one flag update, in stage order.
    assert_eq!(
        bed.store.flag_updates(),
        vec![
            (StageKind::FeatureMatch, 1, RecordFlags::COMPLETED),
            (StageKind::PhotoOrientation, 1, RecordFlags::COMPLETED),
        ]
    );

    assert!(!dir.exists(), "intermediate directory should be removed");
    assert!(bed.scheduler.is_idle());
    assert_eq!(
        event_types(&bed.sink),
        vec![
            "pipeline.enqueued",
            "stage.started",
            "stage.progressed",
            "stage.progressed",
            "stage.completed",
            "stage.started",
            "stage.progressed",
            "stage.progressed",
            "stage.completed",
            "pipeline.completed",
        ]
    );
}

#[test]
fn test_progress_ratios_pass_through() {
    let mut bed = test_bed();
    bed.factory
        .push_task(ScriptedTask::finishing(&[0.25, 0.5, 0.75]));
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::FeatureMatch);
    bed.scheduler.enqueue(pipeline);

    let outcomes = drain(&mut bed.scheduler);
    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Dispatched,
            TickOutcome::Started,
            TickOutcome::Progressed(0.25),
            TickOutcome::Progressed(0.5),
            TickOutcome::Progressed(0.75),
            TickOutcome::PipelineCompleted,
        ]
    );

    // Progress events bracket the run: 0.0 at start, 1.0 at completion,
    // the task's own readings in between.
    let ratios: Vec<f32> = bed
        .sink
        .events_of_type("stage.progressed")
        .iter()
        .filter_map(WorkflowEvent::ratio)
        .collect();
    assert_eq!(ratios, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn test_task_error_aborts_pipeline() {
    let mut bed = test_bed();
    bed.factory.push_task(ScriptedTask::instant_finish());
    bed.factory.push_task(ScriptedTask::failing_after(&[0.3]));
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::PointCloud);
    let dir = pipeline.intermediate_dir().to_path_buf();
    bed.scheduler.enqueue(pipeline);

    let outcomes = drain(&mut bed.scheduler);
    assert_eq!(outcomes.last(), Some(&TickOutcome::PipelineAborted));

    // Only the stage that finished was persisted.
    assert_eq!(
        bed.store.flag_updates(),
        vec![(StageKind::FeatureMatch, 1, RecordFlags::COMPLETED)]
    );
    // The point-cloud stage was never even constructed.
    assert_eq!(bed.factory.issued_count(), 2);
    assert!(dir.is_dir(), "intermediate directory must be retained");
    assert!(bed.scheduler.is_idle());

    let types = event_types(&bed.sink);
    assert!(types.contains(&"stage.failed"));
    assert_eq!(types.last(), Some(&"pipeline.aborted"));
}

#[test]
fn test_resolution_failure_aborts_without_constructing_task() {
    let mut bed = test_bed();
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::FeatureMatch);
    let dir = pipeline.intermediate_dir().to_path_buf();
    bed.store.fail_reads_of(EntityKind::FeatureMatch);
    bed.scheduler.enqueue(pipeline);

    assert_eq!(bed.scheduler.tick(), TickOutcome::PipelineAborted);
    assert_eq!(bed.factory.issued_count(), 0);
    assert!(bed.scheduler.is_idle());
    assert!(dir.is_dir(), "intermediate directory must be retained");

    assert_eq!(
        event_types(&bed.sink),
        vec!["pipeline.enqueued", "stage.failed", "pipeline.aborted"]
    );
    let failed = bed.sink.events_of_type("stage.failed");
    match &failed[0].payload {
        EventPayload::StageFailed { kind, reason, .. } => {
            assert_eq!(*kind, StageKind::FeatureMatch);
            assert!(reason.contains("scripted read failure"));
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn test_persistence_failure_still_completes_entry() {
    let mut bed = test_bed();
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::FeatureMatch);
    let dir = pipeline.intermediate_dir().to_path_buf();
    bed.store.fail_flag_updates(true);
    bed.scheduler.enqueue(pipeline);

    let outcomes = drain(&mut bed.scheduler);
    assert_eq!(outcomes.last(), Some(&TickOutcome::PipelineCompleted));

    // The update was attempted, rejected, and the entry still left the queue.
    assert_eq!(
        bed.store.flag_updates(),
        vec![(StageKind::FeatureMatch, 1, RecordFlags::COMPLETED)]
    );
    let record = bed.store.stage(StageKind::FeatureMatch, 1).unwrap();
    assert_eq!(record.flags, RecordFlags::NOT_COMPLETED);

    let completed = bed.sink.events_of_type("stage.completed");
    assert_eq!(completed.len(), 1);
    assert!(matches!(
        completed[0].payload,
        EventPayload::StageCompleted {
            persisted: false,
            ..
        }
    ));
    assert!(!dir.exists());
}

#[test]
fn test_only_orientation_earns_georeference_flag() {
    let mut bed = test_bed();
    bed.factory
        .push_task(ScriptedTask::instant_finish().with_result(ResultFlags::GEOREFERENCE));
    bed.factory
        .push_task(ScriptedTask::instant_finish().with_result(ResultFlags::GEOREFERENCE));
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::PhotoOrientation);
    bed.scheduler.enqueue(pipeline);

    drain(&mut bed.scheduler);

    // Both tasks report a georeference, but only photo orientation may
    // claim the record flag.
    assert_eq!(
        bed.store.flag_updates(),
        vec![
            (StageKind::FeatureMatch, 1, RecordFlags::COMPLETED),
            (
                StageKind::PhotoOrientation,
                1,
                RecordFlags::COMPLETED | RecordFlags::GEOREFERENCED
            ),
        ]
    );
}

#[test]
fn test_pipelines_run_fifo_one_at_a_time() {
    let mut bed = test_bed();
    let first = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::FeatureMatch);
    let second = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::FeatureMatch);
    let first_id = first.id();
    let second_id = second.id();
    bed.scheduler.enqueue(first);
    bed.scheduler.enqueue(second);
    assert_eq!(bed.scheduler.queued(), 2);

    assert_eq!(bed.scheduler.tick(), TickOutcome::Dispatched);
    assert_eq!(bed.factory.issued_count(), 1, "head pipeline only");

    let outcomes = drain(&mut bed.scheduler);
    let completions = outcomes
        .iter()
        .filter(|outcome| **outcome == TickOutcome::PipelineCompleted)
        .count();
    assert_eq!(completions, 2);

    let started: Vec<Uuid> = bed
        .sink
        .events_of_type("stage.started")
        .iter()
        .map(|event| match event.payload {
            EventPayload::StageStarted { pipeline_id, .. } => pipeline_id,
            _ => panic!("filter returned a non-started event"),
        })
        .collect();
    assert_eq!(started, vec![first_id, second_id]);
}

#[test]
fn test_empty_pipeline_is_discarded() {
    let mut bed = test_bed();
    bed.scheduler.enqueue(Pipeline::new(
        Uuid::new_v4(),
        bed.scratch.path().join("manual"),
        Vec::new(),
    ));
    assert_eq!(bed.scheduler.queued(), 1);

    assert_eq!(bed.scheduler.tick(), TickOutcome::Idle);
    assert_eq!(bed.scheduler.queued(), 0);
}

#[tokio::test]
async fn test_run_drains_queue() {
    let mut bed = test_bed();
    let pipeline = build_pipeline(&bed, StageKind::FeatureMatch, StageKind::PointCloud);
    let dir = pipeline.intermediate_dir().to_path_buf();
    bed.scheduler.enqueue(pipeline);

    bed.scheduler.run(Duration::from_millis(1)).await;

    assert!(bed.scheduler.is_idle());
    assert_eq!(bed.store.flag_updates().len(), 3);
    assert!(!dir.exists());
    assert_eq!(bed.sink.events_of_type("pipeline.completed").len(), 1);
}
