#![allow(dead_code)]

use std::collections::BTreeMap;

use bootdag::config::{ConfigSection, Manifest, RawManifest, TaskManifest};
use bootdag::types::{ExecutorKind, FailurePolicy};

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    manifest: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: RawManifest {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskManifest) -> Self {
        self.manifest.task.insert(name.to_string(), task);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.manifest.config.failure_policy = policy;
        self
    }

    pub fn executor(mut self, kind: ExecutorKind) -> Self {
        self.manifest.config.executor = kind;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.manifest.config.workers = Some(n);
        self
    }

    pub fn await_timeout_ms(mut self, ms: i64) -> Self {
        self.manifest.config.await_timeout_ms = ms;
        self
    }

    /// The unvalidated manifest, for exercising validation errors.
    pub fn raw(self) -> RawManifest {
        self.manifest
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.manifest).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskManifest`.
pub struct TaskManifestBuilder {
    task: TaskManifest,
}

impl TaskManifestBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskManifest::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn wait_on_privileged(mut self, val: bool) -> Self {
        self.task.wait_on_privileged = val;
        self
    }

    pub fn must_run_on_privileged(mut self, val: bool) -> Self {
        self.task.must_run_on_privileged = val;
        self
    }

    pub fn in_stage(mut self, val: bool) -> Self {
        self.task.in_stage = val;
        self
    }

    pub fn sleep_ms(mut self, ms: u64) -> Self {
        self.task.sleep_ms = ms;
        self
    }

    pub fn fail(mut self, val: bool) -> Self {
        self.task.fail = val;
        self
    }

    pub fn build(self) -> TaskManifest {
        self.task
    }
}

impl Default for TaskManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
