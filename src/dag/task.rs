// src/dag/task.rs

//! Task definitions and the per-task runtime node.
//!
//! A task is registered as a [`TaskSpec`]: plain data (name, dependency
//! names, priority, privileged-thread flags, stage membership) plus a single
//! closure holding the work. Once the graph is frozen each spec becomes a
//! [`TaskNode`], which owns the lifecycle state and the count of unfinished
//! predecessors.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Canonical task name type.
pub type TaskName = String;

/// User-supplied work. Invoked at most once.
pub type TaskBody = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Index of a task inside a [`crate::dag::TaskGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Registered, waiting on predecessors.
    Idle,
    /// All predecessors finished; queued on its executor.
    Waiting,
    /// The body is executing.
    Running,
    /// The body returned (successfully, or tolerated under the lenient policy).
    Finished,
}

impl TaskState {
    fn as_u8(self) -> u8 {
        match self {
            TaskState::Idle => 0,
            TaskState::Waiting => 1,
            TaskState::Running => 2,
            TaskState::Finished => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Idle,
            1 => TaskState::Waiting,
            2 => TaskState::Running,
            _ => TaskState::Finished,
        }
    }
}

/// Registration record for one startup task.
///
/// ```
/// use bootdag::dag::TaskSpec;
///
/// let spec = TaskSpec::new("db", || Ok(()))
///     .after("config")
///     .priority(-1)
///     .wait_on_privileged(true);
/// assert_eq!(spec.deps(), ["config".to_string()]);
/// ```
pub struct TaskSpec {
    pub(crate) name: TaskName,
    pub(crate) after: Vec<TaskName>,
    pub(crate) priority: i32,
    pub(crate) wait_on_privileged: bool,
    pub(crate) must_run_on_privileged: bool,
    pub(crate) in_stage: bool,
    pub(crate) body: TaskBody,
}

impl TaskSpec {
    pub fn new<F>(name: impl Into<TaskName>, body: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            after: Vec::new(),
            priority: 0,
            wait_on_privileged: false,
            must_run_on_privileged: false,
            in_stage: true,
            body: Box::new(body),
        }
    }

    /// A task whose body does nothing. Handy as a join point.
    pub fn noop(name: impl Into<TaskName>) -> Self {
        Self::new(name, || Ok(()))
    }

    /// Add a dependency by name.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.after.push(dep.into());
        self
    }

    pub fn after_all<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.after.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Lower values are submitted first among tasks released together.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// `wait` on the privileged thread blocks until this task finishes.
    pub fn wait_on_privileged(mut self, val: bool) -> Self {
        self.wait_on_privileged = val;
        self
    }

    /// The task is executed by the privileged thread, inside `wait`.
    pub fn must_run_on_privileged(mut self, val: bool) -> Self {
        self.must_run_on_privileged = val;
        self
    }

    /// Whether the task counts towards the stage-finished notification.
    pub fn in_stage(mut self, val: bool) -> Self {
        self.in_stage = val;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[TaskName] {
        &self.after
    }

    pub(crate) fn into_parts(self) -> (TaskInfo, Vec<TaskName>, TaskBody) {
        let info = TaskInfo {
            name: self.name,
            priority: self.priority,
            wait_on_privileged: self.wait_on_privileged,
            must_run_on_privileged: self.must_run_on_privileged,
            in_stage: self.in_stage,
        };
        (info, self.after, self.body)
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("after", &self.after)
            .field("priority", &self.priority)
            .field("wait_on_privileged", &self.wait_on_privileged)
            .field("must_run_on_privileged", &self.must_run_on_privileged)
            .field("in_stage", &self.in_stage)
            .finish_non_exhaustive()
    }
}

/// Read-only task metadata handed to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: TaskName,
    pub priority: i32,
    pub wait_on_privileged: bool,
    pub must_run_on_privileged: bool,
    pub in_stage: bool,
}

/// Runtime node for one task.
///
/// `predecessors` and `successors` are written only while the graph is being
/// built and are read-only afterwards. `state` and `pending` are the only
/// fields mutated during a run.
pub(crate) struct TaskNode {
    pub(crate) info: TaskInfo,
    body: Mutex<Option<TaskBody>>,
    state: AtomicU8,
    pending: AtomicUsize,
    pub(crate) predecessors: Vec<TaskId>,
    pub(crate) successors: Vec<TaskId>,
}

impl TaskNode {
    pub(crate) fn new(info: TaskInfo, body: TaskBody) -> Self {
        Self {
            info,
            body: Mutex::new(Some(body)),
            state: AtomicU8::new(TaskState::Idle.as_u8()),
            pending: AtomicUsize::new(0),
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Atomically move from `from` to `to`. Returns `false` if the task was
    /// not in `from`.
    pub(crate) fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn add_pending(&mut self) {
        *self.pending.get_mut() += 1;
    }

    /// Record that one predecessor finished. Returns `true` for exactly one
    /// caller: the one that released the last outstanding predecessor.
    pub(crate) fn release_one(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|previous| previous == 1)
            .unwrap_or(false)
    }

    pub(crate) fn take_body(&self) -> Option<TaskBody> {
        match self.body.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("name", &self.info.name)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .field("predecessors", &self.predecessors)
            .field("successors", &self.successors)
            .finish()
    }
}
