//! Scripted stage tasks and factory.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;

use crate::config::StageConfig;
use crate::core::{ResultFlags, StageKind, TaskState};
use crate::task::{StageTask, TaskFactory};

/// A stage task that replays a scripted sequence of state readings.
///
/// Before `start` the task always reads READY. Afterwards each `state`
/// call consumes the next scripted reading; once the script is exhausted
/// the last reading sticks, so terminal states stay terminal.
pub struct ScriptedTask {
    script: Mutex<VecDeque<(TaskState, f32)>>,
    current: Mutex<(TaskState, f32)>,
    starts: AtomicUsize,
    started_with: Mutex<Option<StageConfig>>,
    result: ResultFlags,
}

impl ScriptedTask {
    fn from_script(script: Vec<(TaskState, f32)>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            current: Mutex::new((TaskState::Ready, 0.0)),
            starts: AtomicUsize::new(0),
            started_with: Mutex::new(None),
            result: ResultFlags::NONE,
        }
    }

    /// A task that reads FINISHED on its first post-start poll.
    #[must_use]
    pub fn instant_finish() -> Self {
        Self::from_script(vec![(TaskState::Finished, 1.0)])
    }

    /// A task that works through `ratios`, then finishes.
    #[must_use]
    pub fn finishing(ratios: &[f32]) -> Self {
        let mut script: Vec<_> = ratios
            .iter()
            .map(|&ratio| (TaskState::Working, ratio))
            .collect();
        script.push((TaskState::Finished, 1.0));
        Self::from_script(script)
    }

    /// A task that works through `ratios`, then fails.
    #[must_use]
    pub fn failing_after(ratios: &[f32]) -> Self {
        let mut script: Vec<_> = ratios
            .iter()
            .map(|&ratio| (TaskState::Working, ratio))
            .collect();
        script.push((TaskState::Error, ratios.last().copied().unwrap_or(0.0)));
        Self::from_script(script)
    }

    /// A task that works through `steps` randomly sized but strictly
    /// increasing progress readings, then finishes.
    #[must_use]
    pub fn working_ramp(steps: usize) -> Self {
        let mut rng = rand::thread_rng();
        let mut ratio = 0.0_f32;
        let mut ratios = Vec::with_capacity(steps);
        for _ in 0..steps {
            ratio = (ratio + rng.gen_range(0.01..0.2)).min(0.99);
            ratios.push(ratio);
        }
        Self::finishing(&ratios)
    }

    /// Sets the result bits reported once finished.
    #[must_use]
    pub fn with_result(mut self, result: ResultFlags) -> Self {
        self.result = result;
        self
    }

    /// How many times `start` was called.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// The configuration received by the first `start` call, if any.
    #[must_use]
    pub fn started_with(&self) -> Option<StageConfig> {
        self.started_with.lock().clone()
    }
}

impl StageTask for ScriptedTask {
    fn start(&self, config: &StageConfig) {
        if self.starts.fetch_add(1, Ordering::SeqCst) == 0 {
            *self.started_with.lock() = Some(config.clone());
        }
    }

    fn state(&self) -> TaskState {
        if self.starts.load(Ordering::SeqCst) == 0 {
            return TaskState::Ready;
        }
        let mut current = self.current.lock();
        if let Some(next) = self.script.lock().pop_front() {
            *current = next;
        }
        current.0
    }

    fn completion_ratio(&self) -> f32 {
        self.current.lock().1
    }

    fn result_code(&self) -> ResultFlags {
        self.result
    }
}

impl StageTask for Arc<ScriptedTask> {
    fn start(&self, config: &StageConfig) {
        self.as_ref().start(config);
    }

    fn state(&self) -> TaskState {
        self.as_ref().state()
    }

    fn completion_ratio(&self) -> f32 {
        self.as_ref().completion_ratio()
    }

    fn result_code(&self) -> ResultFlags {
        self.as_ref().result_code()
    }
}

/// A factory that hands out pre-queued scripted tasks.
///
/// Tasks are issued in push order regardless of stage kind; when the
/// queue is empty an instantly finishing task is issued. The factory
/// keeps a handle to every issued task so tests can inspect them after
/// the scheduler has moved on.
#[derive(Default)]
pub struct ScriptedFactory {
    pending: Mutex<VecDeque<Arc<ScriptedTask>>>,
    issued: Mutex<Vec<(StageKind, Arc<ScriptedTask>)>>,
}

impl ScriptedFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next task to issue, returning a handle to it.
    pub fn push_task(&self, task: ScriptedTask) -> Arc<ScriptedTask> {
        let task = Arc::new(task);
        self.pending.lock().push_back(task.clone());
        task
    }

    /// Every issued task with the stage kind it was issued for.
    #[must_use]
    pub fn issued(&self) -> Vec<(StageKind, Arc<ScriptedTask>)> {
        self.issued.lock().clone()
    }

    /// How many tasks have been issued.
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.issued.lock().len()
    }
}

impl TaskFactory for ScriptedFactory {
    fn make_task(&self, config: &StageConfig) -> Box<dyn StageTask> {
        let task = self
            .pending
            .lock()
            .pop_front()
            .unwrap_or_else(|| Arc::new(ScriptedTask::instant_finish()));
        self.issued.lock().push((config.kind(), task.clone()));
        Box::new(task)
    }
}

impl TaskFactory for Arc<ScriptedFactory> {
    fn make_task(&self, config: &StageConfig) -> Box<dyn StageTask> {
        self.as_ref().make_task(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_config() -> StageConfig {
        StageConfig::SurfaceModel(crate::config::SurfaceModelConfig {
            input_xml_path: "/tmp/in.xml".into(),
            dense_cloud_path: "/tmp/dense.bin".into(),
            output_dir: "/tmp/out".into(),
            worker_threads: 1,
        })
    }

    #[test]
    fn test_ready_until_started() {
        let task = ScriptedTask::instant_finish();
        assert_eq!(task.state(), TaskState::Ready);
        assert_eq!(task.state(), TaskState::Ready);

        task.start(&dummy_config());
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[test]
    fn test_script_replays_then_sticks() {
        let task = ScriptedTask::finishing(&[0.25, 0.75]);
        task.start(&dummy_config());

        assert_eq!(task.state(), TaskState::Working);
        assert_eq!(task.completion_ratio(), 0.25);
        assert_eq!(task.state(), TaskState::Working);
        assert_eq!(task.completion_ratio(), 0.75);
        assert_eq!(task.state(), TaskState::Finished);
        assert_eq!(task.completion_ratio(), 1.0);
        // Terminal state sticks past the end of the script.
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[test]
    fn test_failing_task_ends_in_error() {
        let task = ScriptedTask::failing_after(&[0.5]);
        task.start(&dummy_config());

        assert_eq!(task.state(), TaskState::Working);
        assert_eq!(task.state(), TaskState::Error);
        assert_eq!(task.state(), TaskState::Error);
    }

    #[test]
    fn test_working_ramp_is_monotonic() {
        let task = ScriptedTask::working_ramp(16);
        task.start(&dummy_config());

        let mut last = 0.0_f32;
        while task.state() == TaskState::Working {
            let ratio = task.completion_ratio();
            assert!(ratio >= last);
            last = ratio;
        }
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[test]
    fn test_start_records_config() {
        let task = ScriptedTask::instant_finish();
        assert_eq!(task.start_count(), 0);

        task.start(&dummy_config());
        assert_eq!(task.start_count(), 1);
        assert_eq!(
            task.started_with().map(|config| config.kind()),
            Some(StageKind::SurfaceModel)
        );
    }

    #[test]
    fn test_factory_issues_in_push_order() {
        let factory = ScriptedFactory::new();
        let first = factory.push_task(ScriptedTask::finishing(&[0.5]));
        let second = factory.push_task(ScriptedTask::instant_finish());

        let issued_first = factory.make_task(&dummy_config());
        issued_first.start(&dummy_config());
        assert_eq!(first.start_count(), 1);
        assert_eq!(second.start_count(), 0);

        assert_eq!(factory.issued_count(), 1);
        assert_eq!(factory.issued()[0].0, StageKind::SurfaceModel);
    }

    #[test]
    fn test_factory_defaults_to_instant_finish() {
        let factory = ScriptedFactory::new();
        let task = factory.make_task(&dummy_config());
        task.start(&dummy_config());
        assert_eq!(task.state(), TaskState::Finished);
    }
}
