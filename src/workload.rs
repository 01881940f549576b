// src/workload.rs

//! Simulated task bodies for manifest-driven runs.
//!
//! A manifest has no real work to run, so each `[task.<name>]` becomes a
//! [`TaskSpec`] whose body sleeps for `sleep_ms` and optionally fails.

use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::config::{Manifest, TaskManifest};
use crate::dag::TaskSpec;

/// Build a [`TaskSpec`] for one manifest task.
pub fn simulated_task(name: &str, task: &TaskManifest) -> TaskSpec {
    let sleep = Duration::from_millis(task.sleep_ms);
    let fail = task.fail;
    let label = name.to_string();

    TaskSpec::new(name, move || {
        trace!(task = %label, sleep_ms = sleep.as_millis() as u64, "simulated work");
        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
        if fail {
            anyhow::bail!("simulated failure in task '{label}'");
        }
        Ok(())
    })
    .after_all(task.after.iter().cloned())
    .priority(task.priority)
    .wait_on_privileged(task.wait_on_privileged)
    .must_run_on_privileged(task.must_run_on_privileged)
    .in_stage(task.in_stage)
}

/// All tasks of a manifest, in name order.
pub fn simulated_tasks(manifest: &Manifest) -> Vec<TaskSpec> {
    manifest
        .task
        .iter()
        .map(|(name, task)| simulated_task(name, task))
        .collect()
}
