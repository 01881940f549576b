// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{ExecutorKind, FailurePolicy};

/// Startup manifest as read from a TOML file.
///
/// ```toml
/// [config]
/// failure_policy = "strict"
/// workers = 4
///
/// [task.config]
/// sleep_ms = 20
///
/// [task.ui]
/// after = ["config"]
/// must_run_on_privileged = true
/// ```
///
/// Deserialized as a [`RawManifest`]; use [`Manifest::try_from`] (or
/// [`crate::config::load_and_validate`]) to obtain a validated [`Manifest`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    /// Run-wide settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskManifest>,
}

/// A manifest that passed validation.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskManifest>,
}

impl Manifest {
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskManifest>) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"strict"` or `"lenient"`.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// `"pool"` or `"tokio"`.
    #[serde(default)]
    pub executor: ExecutorKind,

    /// Worker thread count. `None` picks a size from the CPU count.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Deadline for the privileged thread's wait, in milliseconds.
    /// Zero or negative waits indefinitely.
    #[serde(default)]
    pub await_timeout_ms: i64,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            executor: ExecutorKind::default(),
            workers: None,
            await_timeout_ms: 0,
        }
    }
}

impl ConfigSection {
    pub fn await_timeout(&self) -> Option<Duration> {
        timeout_from_millis(self.await_timeout_ms)
    }
}

/// Map a millisecond timeout to an optional deadline; `<= 0` means none.
pub fn timeout_from_millis(ms: i64) -> Option<Duration> {
    if ms > 0 {
        Some(Duration::from_millis(ms as u64))
    } else {
        None
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskManifest {
    /// Tasks that must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Lower values are submitted first among tasks released together.
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub wait_on_privileged: bool,

    #[serde(default)]
    pub must_run_on_privileged: bool,

    #[serde(default = "default_in_stage")]
    pub in_stage: bool,

    /// Simulated work: how long the body sleeps.
    #[serde(default)]
    pub sleep_ms: u64,

    /// Simulated failure: the body returns an error after sleeping.
    #[serde(default)]
    pub fail: bool,
}

fn default_in_stage() -> bool {
    true
}

impl Default for TaskManifest {
    fn default() -> Self {
        Self {
            after: Vec::new(),
            priority: 0,
            wait_on_privileged: false,
            must_run_on_privileged: false,
            in_stage: default_in_stage(),
            sleep_ms: 0,
            fail: false,
        }
    }
}
