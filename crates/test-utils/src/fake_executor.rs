use std::collections::VecDeque;
use std::sync::Mutex;

use bootdag::exec::{Executor, Job};

/// A fake executor that queues every submitted job until the test runs it.
///
/// Gives tests full control over interleaving: nothing happens until
/// `run_next` or `run_all` is called.
#[derive(Default)]
pub struct ManualExecutor {
    jobs: Mutex<VecDeque<Job>>,
    submitted: Mutex<usize>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs submitted but not yet run.
    pub fn pending(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Jobs submitted over the executor's lifetime.
    pub fn submitted(&self) -> usize {
        *self.submitted.lock().unwrap()
    }

    /// Run the oldest queued job. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // Release the lock before running: the job may submit more work.
        let job = self.jobs.lock().unwrap().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run jobs until the queue stays empty. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        *self.submitted.lock().unwrap() += 1;
        self.jobs.lock().unwrap().push_back(job);
    }
}

/// Runs every job immediately on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}
