use std::str::FromStr;
use serde::Deserialize;

/// What happens when a task body returns an error or panics.
///
/// - `Strict`: the failure is fatal for the whole run. Dependents of the failed
///   task never start and [`crate::engine::Startup::wait`] returns the error.
/// - `Lenient`: the failure is logged, the task counts as finished and its
///   dependents proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Strict,
    Lenient,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Lenient
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(FailurePolicy::Strict),
            "lenient" => Ok(FailurePolicy::Lenient),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"strict\" or \"lenient\")"
            )),
        }
    }
}

/// Which worker executor a manifest-driven run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Dedicated OS-thread pool ([`crate::exec::WorkerPool`]).
    Pool,
    /// Tokio's blocking pool ([`crate::exec::TokioExecutor`]).
    Tokio,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::Pool
    }
}

/// Lifecycle of a whole startup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Finished,
}

impl RunState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            RunState::NotStarted => 0,
            RunState::Running => 1,
            RunState::Finished => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            _ => RunState::Finished,
        }
    }
}
