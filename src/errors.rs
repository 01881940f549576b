// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::dag::TaskName;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("task name must not be empty")]
    EmptyTaskName,

    #[error("task '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("task '{task}' depends on '{dependency}', which is not a registered task")]
    UnregisteredDependency {
        task: TaskName,
        dependency: TaskName,
    },

    #[error("task '{0}' cannot depend on itself")]
    SelfDependency(TaskName),

    #[error("no start task: every task has at least one dependency, check task dependencies")]
    EmptyFrontier,

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("no worker executor configured")]
    MissingExecutor,

    #[error("task '{0}' was started twice, is there a circular dependency?")]
    TaskStartedTwice(TaskName),

    #[error("startup run has already been started")]
    RunAlreadyStarted,

    #[error("startup run has not been started")]
    RunNotStarted,

    #[error("task '{task}' failed: {message}")]
    TaskFailed { task: TaskName, message: String },

    #[error("run finished but these tasks never finished: {0:?}")]
    Inconsistent(Vec<TaskName>),

    #[error("startup run was aborted by an earlier fatal error")]
    RunAborted,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BootError>;
