use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use bootdag::dag::TaskInfo;
use bootdag::engine::{RunListener, TaskListener, TaskTiming};

use crate::eventually;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Queued,
    Started,
    Finished,
}

/// One listener callback, as seen by [`Recorder`].
#[derive(Debug, Clone)]
pub struct Event {
    pub task: String,
    pub phase: Phase,
    pub at: Instant,
    pub thread: ThreadId,
}

/// Listener that records every task and run callback.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    run_started: AtomicUsize,
    run_finished: AtomicUsize,
    stage_finished: AtomicUsize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, task: &TaskInfo, phase: Phase) {
        self.events.lock().unwrap().push(Event {
            task: task.name.clone(),
            phase,
            at: Instant::now(),
            thread: thread::current().id(),
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// The first event of `phase` for `task`.
    pub fn event(&self, task: &str, phase: Phase) -> Option<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.task == task && e.phase == phase)
            .cloned()
    }

    /// How many times `task` reached `phase`.
    pub fn count(&self, task: &str, phase: Phase) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.task == task && e.phase == phase)
            .count()
    }

    /// Task names in the order they reached `phase`.
    pub fn order(&self, phase: Phase) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.phase == phase)
            .map(|e| e.task.clone())
            .collect()
    }

    pub fn started_at(&self, task: &str) -> Instant {
        self.event(task, Phase::Started)
            .unwrap_or_else(|| panic!("task '{task}' never started"))
            .at
    }

    pub fn finished_at(&self, task: &str) -> Instant {
        self.event(task, Phase::Finished)
            .unwrap_or_else(|| panic!("task '{task}' never finished"))
            .at
    }

    /// Thread the body of `task` ran on.
    pub fn thread_of(&self, task: &str) -> ThreadId {
        self.event(task, Phase::Started)
            .unwrap_or_else(|| panic!("task '{task}' never started"))
            .thread
    }

    pub fn run_started(&self) -> usize {
        self.run_started.load(Ordering::SeqCst)
    }

    pub fn run_finished(&self) -> usize {
        self.run_finished.load(Ordering::SeqCst)
    }

    pub fn stage_finished(&self) -> usize {
        self.stage_finished.load(Ordering::SeqCst)
    }

    /// Block (polling) until the run-finish notification fired.
    pub fn wait_for_run_finish(&self, timeout: Duration) -> bool {
        eventually(timeout, || self.run_finished() > 0)
    }
}

impl TaskListener for Recorder {
    fn on_wait_start(&self, task: &TaskInfo) {
        self.push(task, Phase::Queued);
    }

    fn on_task_start(&self, task: &TaskInfo) {
        self.push(task, Phase::Started);
    }

    fn on_task_finish(&self, task: &TaskInfo, _timing: TaskTiming) {
        self.push(task, Phase::Finished);
    }
}

impl RunListener for Recorder {
    fn on_run_start(&self) {
        self.run_started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_run_finish(&self) {
        self.run_finished.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stage_finish(&self) {
        self.stage_finished.fetch_add(1, Ordering::SeqCst);
    }
}
