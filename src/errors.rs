// src/errors.rs

//! Crate-wide error types.
//!
//! Errors are split by *when* they surface:
//! - [`SchedulerError`]: synchronous misuse, returned from the offending call.
//! - [`RunError`]: graph and execution faults, returned by awaiting a
//!   [`RunHandle`](crate::engine::RunHandle).
//! - [`TaskError`]: the terminal fault of a single task.
//! - [`ConfigError`]: loading / validating a task file for the CLI.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::engine::TaskName;

/// Errors detected synchronously at the call that violates a precondition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("task title must not be empty or whitespace (got {0:?})")]
    InvalidTitle(String),

    #[error("task with following name already exists: {0}")]
    DuplicateTitle(TaskName),

    #[error(
        "scheduler generation {generation} has already been run; call reset() to reuse this instance"
    )]
    AlreadyRun { generation: u64 },

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Where in a task's lifecycle cancellation was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStage {
    /// The wait on dependencies was aborted, or the executor refused to start
    /// the body. The body never ran.
    BeforeStart,
    /// The body itself observed the signal and stopped cooperatively.
    WhileRunning,
}

impl fmt::Display for CancelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelStage::BeforeStart => f.write_str("before it started"),
            CancelStage::WhileRunning => f.write_str("while running"),
        }
    }
}

/// Terminal fault of a single task.
///
/// Cheap to clone so that every handle observing the task can report it.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("task '{task}' failed: {error:#}")]
    Failed {
        task: TaskName,
        error: Arc<anyhow::Error>,
    },

    #[error("task '{task}' panicked: {message}")]
    Panicked { task: TaskName, message: String },

    #[error("task '{task}' did not start because dependency '{dependency}' did not succeed: {cause}")]
    DependencyFailed {
        task: TaskName,
        dependency: TaskName,
        cause: Box<TaskError>,
    },

    #[error("task '{task}' was cancelled {stage}")]
    Cancelled { task: TaskName, stage: CancelStage },
}

impl TaskError {
    /// Title of the task this error belongs to.
    pub fn task(&self) -> &str {
        match self {
            TaskError::Failed { task, .. }
            | TaskError::Panicked { task, .. }
            | TaskError::DependencyFailed { task, .. }
            | TaskError::Cancelled { task, .. } => task,
        }
    }

    /// `true` if the root cause is cancellation rather than a genuine fault.
    ///
    /// A dependent of a cancelled task counts as cancelled too.
    pub fn is_cancellation(&self) -> bool {
        match self {
            TaskError::Cancelled { .. } => true,
            TaskError::DependencyFailed { cause, .. } => cause.is_cancellation(),
            TaskError::Failed { .. } | TaskError::Panicked { .. } => false,
        }
    }

    /// Follow `DependencyFailed` links down to the task that actually faulted.
    pub fn root_cause(&self) -> &TaskError {
        match self {
            TaskError::DependencyFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// Failure of a whole run, observed through its `RunHandle`.
#[derive(Error, Debug, Clone)]
pub enum RunError {
    #[error("dependency resolution for task '{task}': could not locate dependency '{dependency}'")]
    MissingDependency { task: TaskName, dependency: TaskName },

    #[error("cycle detected in task graph involving: {}", tasks.join(", "))]
    CycleDetected { tasks: Vec<TaskName> },

    #[error("{} task(s) did not complete successfully", failures.len())]
    TasksFailed { failures: Vec<TaskError> },

    #[error("run supervisor terminated abnormally: {0}")]
    Aborted(String),
}

impl RunError {
    /// Per-task faults; empty for graph errors.
    pub fn failures(&self) -> &[TaskError] {
        match self {
            RunError::TasksFailed { failures } => failures,
            _ => &[],
        }
    }

    /// `true` if every task fault in this run is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            RunError::TasksFailed { failures } => {
                !failures.is_empty() && failures.iter().all(TaskError::is_cancellation)
            }
            _ => false,
        }
    }

    /// Fault reported for a given task, if any.
    pub fn failure_of(&self, task: &str) -> Option<&TaskError> {
        self.failures().iter().find(|f| f.task() == task)
    }
}

/// Errors from loading and validating a task file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;
