// src/engine/startup.rs

//! The orchestrator: owns one run of the task graph.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::dag::{GraphBuilder, TaskGraph, TaskSpec, TaskState};
use crate::engine::bookkeeping::RunBook;
use crate::engine::listener::{RunListener, TaskListener};
use crate::engine::run::{CompletionSink, Run};
use crate::errors::{BootError, Result};
use crate::exec::privileged::Handoff;
use crate::exec::{Executor, PrivilegedQueue};
use crate::types::{FailurePolicy, RunState};

/// How a call to [`Startup::wait`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every privileged task ran and every must-wait task finished.
    Completed,
    /// The deadline passed first. Queued privileged work was left unrun;
    /// tasks on the worker pool keep going.
    TimedOut {
        pending_privileged: usize,
        pending_waits: usize,
    },
}

impl WaitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, WaitOutcome::Completed)
    }
}

/// Builder for [`Startup`].
///
/// The worker executor is injected explicitly; there is no global pool.
pub struct StartupBuilder {
    graph: GraphBuilder,
    executor: Option<Arc<dyn Executor>>,
    policy: FailurePolicy,
    task_listeners: Vec<Arc<dyn TaskListener>>,
    run_listeners: Vec<Arc<dyn RunListener>>,
}

impl StartupBuilder {
    pub fn new() -> Self {
        Self {
            graph: GraphBuilder::new(),
            executor: None,
            policy: FailurePolicy::default(),
            task_listeners: Vec::new(),
            run_listeners: Vec::new(),
        }
    }

    /// Register a task. Empty and duplicate names are rejected here.
    pub fn add(mut self, task: TaskSpec) -> Result<Self> {
        self.graph.add(task)?;
        Ok(self)
    }

    /// Add a dependency edge between two registered tasks by name.
    pub fn add_dependency(mut self, task: &str, dependency: &str) -> Result<Self> {
        self.graph.add_dependency(task, dependency)?;
        Ok(self)
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn task_listener(mut self, listener: Arc<dyn TaskListener>) -> Self {
        self.task_listeners.push(listener);
        self
    }

    pub fn run_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.run_listeners.push(listener);
        self
    }

    /// Resolve dependencies and freeze the graph.
    pub fn build(self) -> Result<Startup> {
        let executor = self.executor.ok_or(BootError::MissingExecutor)?;
        let graph = self.graph.build()?;

        let queue = PrivilegedQueue::new();
        let book = Arc::new(RunBook::new(
            &graph,
            self.policy,
            self.run_listeners,
            queue.executor(),
        ));
        let sink: Arc<dyn CompletionSink> = book.clone();
        let run = Arc::new(Run::new(
            graph,
            executor,
            queue.executor(),
            self.policy,
            self.task_listeners,
            sink,
        ));

        Ok(Startup {
            run,
            book,
            queue,
            policy: self.policy,
        })
    }
}

impl Default for StartupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One execution of a startup task graph.
///
/// ```no_run
/// use std::sync::Arc;
/// use bootdag::dag::TaskSpec;
/// use bootdag::engine::StartupBuilder;
/// use bootdag::exec::WorkerPool;
///
/// # fn main() -> bootdag::errors::Result<()> {
/// let pool = Arc::new(WorkerPool::new(4)?);
/// let startup = StartupBuilder::new()
///     .executor(pool)
///     .add(TaskSpec::new("config", || Ok(())))?
///     .add(TaskSpec::new("ui", || Ok(())).after("config").must_run_on_privileged(true))?
///     .build()?;
///
/// startup.start()?;
/// startup.wait(None)?;
/// # Ok(())
/// # }
/// ```
pub struct Startup {
    run: Arc<Run>,
    book: Arc<RunBook>,
    queue: PrivilegedQueue,
    policy: FailurePolicy,
}

impl fmt::Debug for Startup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Startup")
            .field("graph", self.run.graph())
            .field("state", &self.book.state())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Drop for Startup {
    fn drop(&mut self) {
        // Queued jobs hold the run alive; unrun privileged work is abandoned.
        let discarded = self.queue.discard();
        if discarded > 0 {
            debug!(discarded, "dropping unrun privileged tasks");
        }
    }
}

impl Startup {
    pub fn builder() -> StartupBuilder {
        StartupBuilder::new()
    }

    /// Fire the run-start notification and start every frontier task.
    ///
    /// Returns immediately; tasks run on their executors.
    pub fn start(&self) -> Result<&Self> {
        let graph = self.run.graph();
        if graph.frontier().is_empty() {
            return Err(BootError::EmptyFrontier);
        }
        self.book.begin()?;

        info!(
            tasks = graph.len(),
            frontier = graph.frontier().len(),
            privileged = self.book.pending_privileged(),
            waits = self.book.pending_waits(),
            "starting startup run"
        );
        self.book.notify_run_start();

        for &id in graph.frontier() {
            self.run.start_task(id)?;
        }
        Ok(self)
    }

    /// Start a single task by name.
    ///
    /// Fails with [`BootError::TaskStartedTwice`] unless the task is still
    /// `Idle`. [`Startup::start`] already starts every frontier task, and the
    /// rest are started by their last finishing predecessor.
    pub fn start_task(&self, name: &str) -> Result<()> {
        let id = self
            .run
            .graph()
            .id_of(name)
            .ok_or_else(|| BootError::TaskNotFound(name.to_string()))?;
        self.run.start_task(id)
    }

    /// Run queued privileged work, then block until every must-wait task
    /// finished.
    ///
    /// Call this from the privileged thread after [`Startup::start`]: it is
    /// the only place privileged tasks are executed. `timeout` is one
    /// deadline shared by both phases; `None` or a zero duration waits
    /// indefinitely. A timeout is not an error, see [`WaitOutcome::TimedOut`].
    pub fn wait(&self, timeout: Option<Duration>) -> Result<WaitOutcome> {
        if self.book.state() == RunState::NotStarted {
            return Err(BootError::RunNotStarted);
        }
        let deadline = deadline_after(timeout);

        if !self.drain_privileged(deadline)? {
            return Ok(self.timed_out());
        }

        if let Some(latch) = self.book.must_wait() {
            if !latch.wait(deadline) {
                self.book.check_failure()?;
                debug!(pending = latch.remaining(), "timed out waiting for must-wait tasks");
                return Ok(self.timed_out());
            }
        }

        self.book.check_failure()?;
        Ok(WaitOutcome::Completed)
    }

    /// Block until every task finished, or until `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout and the run's fatal error if it
    /// aborted. A zero `timeout` waits indefinitely, as in [`Startup::wait`]. Privileged tasks only run inside [`Startup::wait`], so call
    /// that first when the graph has any.
    pub fn wait_finished(&self, timeout: Option<Duration>) -> Result<bool> {
        if self.book.state() == RunState::NotStarted {
            return Err(BootError::RunNotStarted);
        }
        let deadline = deadline_after(timeout);
        let finished = self.book.finished().wait(deadline);
        self.book.check_failure()?;
        Ok(finished)
    }

    /// Surface the run's fatal error, if any.
    pub fn check(&self) -> Result<()> {
        self.book.check_failure()
    }

    /// [`Startup::start`] followed by [`Startup::wait`].
    pub fn start_and_wait(&self, timeout: Option<Duration>) -> Result<WaitOutcome> {
        self.start()?;
        self.wait(timeout)
    }

    /// Pull and run privileged jobs until none are outstanding.
    /// Returns `false` if the deadline passed first.
    fn drain_privileged(&self, deadline: Option<Instant>) -> Result<bool> {
        while self.book.pending_privileged() > 0 {
            self.book.check_failure()?;
            match self.queue.next(deadline) {
                Some(Handoff::Run(job)) => job(),
                Some(Handoff::Wake) => {}
                None => {
                    warn!(
                        pending = self.book.pending_privileged(),
                        queued = self.queue.len(),
                        "timed out draining privileged queue; abandoning remaining privileged work"
                    );
                    return Ok(false);
                }
            }
        }
        self.book.check_failure()?;
        Ok(true)
    }

    fn timed_out(&self) -> WaitOutcome {
        WaitOutcome::TimedOut {
            pending_privileged: self.book.pending_privileged(),
            pending_waits: self.book.pending_waits(),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        self.run.graph()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn task_state(&self, name: &str) -> Option<TaskState> {
        let graph = self.run.graph();
        graph.id_of(name).map(|id| graph.state(id))
    }

    pub fn run_state(&self) -> RunState {
        self.book.state()
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.run_state() == RunState::Finished
    }

    /// Whether a fatal error aborted the run.
    pub fn is_aborted(&self) -> bool {
        self.book.is_aborted()
    }

    /// Tasks that have not finished yet.
    pub fn remaining(&self) -> usize {
        self.book.remaining()
    }

    /// Privileged-thread tasks that have not finished yet.
    pub fn pending_privileged(&self) -> usize {
        self.book.pending_privileged()
    }

    /// Must-wait tasks that have not finished yet.
    pub fn pending_waits(&self) -> usize {
        self.book.pending_waits()
    }
}

/// `None` and zero both mean "no deadline".
fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout
        .filter(|t| !t.is_zero())
        .map(|t| Instant::now() + t)
}
