// src/exec/pool.rs

//! Fixed-size OS-thread worker pool.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, warn};

use crate::errors::Result;
use crate::exec::backend::{Executor, Job};

/// Worker pool with named threads (`bootdag-worker-N`) sharing one FIFO queue.
///
/// Dropping the pool closes the queue and joins every worker after the
/// already-queued jobs have run.
#[derive(Debug)]
pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let (tx, rx) = unbounded::<Job>();

        let mut workers = Vec::with_capacity(threads);
        for idx in 0..threads {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("bootdag-worker-{idx}"))
                .spawn(move || worker_loop(rx))?;
            workers.push(handle);
        }

        debug!(threads, "worker pool started");
        Ok(Self {
            tx: Some(tx),
            workers,
        })
    }

    /// Pool sized for startup work: `max(3, 1.5 * cpus + 1)`.
    pub fn with_default_parallelism() -> Result<Self> {
        Self::new(default_parallelism())
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }
}

/// Default worker count used when none is configured.
pub fn default_parallelism() -> usize {
    let cpus = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 3 / 2 + 1).max(3)
}

fn worker_loop(rx: Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            error!(
                panic = %panic_message(payload.as_ref()),
                "job panicked on worker thread"
            );
        }
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) {
        match &self.tx {
            Some(tx) => {
                if tx.send(job).is_err() {
                    warn!("worker pool queue closed; dropping job");
                }
            }
            None => warn!("worker pool shut down; dropping job"),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.tx.take();
        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            // A job may hold the last reference to the pool.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread exited with a panic");
            }
        }
    }
}

/// Best-effort text for a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
