// src/engine/waiter.rs

//! Per-task supervision: wait for dependencies, then hand off the body.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cancel::{CancelSignal, Cancelled};
use crate::dag::registry::JobFactory;
use crate::engine::TaskName;
use crate::errors::{CancelStage, TaskError};
use crate::exec::backend::{Executor, JobOutcome};
use crate::handle::{TaskSlot, TaskState};

/// A task ready to be supervised: dependencies resolved to their slots.
pub(crate) struct PlannedTask {
    pub slot: Arc<TaskSlot>,
    pub deps: Vec<Arc<TaskSlot>>,
    pub job: Option<JobFactory>,
}

impl PlannedTask {
    pub fn title(&self) -> &str {
        self.slot.title()
    }
}

/// Drive one task to a terminal state and publish it on the task's slot.
pub(crate) async fn supervise<E: Executor>(
    task: PlannedTask,
    signal: CancelSignal,
    executor: Arc<E>,
) -> Result<(), TaskError> {
    let slot = Arc::clone(&task.slot);
    let guard = UnwindGuard {
        slot: Arc::clone(&slot),
        armed: true,
    };
    let outcome = wait_then_execute(task, &signal, executor.as_ref()).await;

    match &outcome {
        Ok(()) => debug!(task = %slot.title(), "task succeeded"),
        Err(err) if err.is_cancellation() => info!(task = %slot.title(), reason = %err, "task cancelled"),
        Err(err) => warn!(task = %slot.title(), error = %err, "task failed"),
    }

    slot.set_state(TaskState::from_outcome(&outcome));
    guard.disarm();
    outcome
}

/// Publishes a terminal state if the supervisor is dropped mid-flight
/// (executor panic, runtime shutdown), so dependents never wait forever.
struct UnwindGuard {
    slot: Arc<TaskSlot>,
    armed: bool,
}

impl UnwindGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(task = %self.slot.title(), "task supervisor stopped before reporting an outcome");
            self.slot
                .fail_unfinished("task supervisor stopped before reporting an outcome");
        }
    }
}

async fn wait_then_execute<E: Executor + ?Sized>(
    task: PlannedTask,
    signal: &CancelSignal,
    executor: &E,
) -> Result<(), TaskError> {
    let title = task.title().to_string();

    if !task.deps.is_empty() {
        task.slot.set_state(TaskState::Waiting);
        debug!(task = %title, deps = task.deps.len(), "waiting for dependencies");
        wait_for_dependencies(&title, &task.deps, signal).await?;
    }

    let Some(factory) = task.job else {
        // Work is taken exactly once per generation; reaching this means the
        // record was scheduled twice.
        return Err(TaskError::Failed {
            task: title,
            error: Arc::new(anyhow::anyhow!("task body was already consumed")),
        });
    };

    debug!(task = %title, "dependencies satisfied; submitting body");
    let job = factory(signal.clone());

    match executor.submit(job, signal.clone()).await {
        JobOutcome::Completed => Ok(()),
        JobOutcome::Rejected => Err(TaskError::Cancelled {
            task: title,
            stage: CancelStage::BeforeStart,
        }),
        JobOutcome::Failed(err) if err.is::<Cancelled>() => Err(TaskError::Cancelled {
            task: title,
            stage: CancelStage::WhileRunning,
        }),
        JobOutcome::Failed(err) => Err(TaskError::Failed {
            task: title,
            error: Arc::new(err),
        }),
        JobOutcome::Panicked(message) => Err(TaskError::Panicked {
            task: title,
            message,
        }),
    }
}

/// Wait until every dependency is terminal.
///
/// All dependencies are awaited even after one has failed, so the fault is
/// reported only once the whole wait set has settled. The first failed
/// dependency (in declaration order) becomes the cause.
async fn wait_for_dependencies(
    title: &str,
    deps: &[Arc<TaskSlot>],
    signal: &CancelSignal,
) -> Result<(), TaskError> {
    let mut first_failure: Option<(TaskName, TaskError)> = None;

    for dep in deps {
        let state = tokio::select! {
            biased;
            _ = signal.cancelled() => {
                return Err(TaskError::Cancelled {
                    task: title.to_string(),
                    stage: CancelStage::BeforeStart,
                });
            }
            state = dep.wait_terminal() => state,
        };

        if first_failure.is_none() {
            if let Some(err) = state.error() {
                first_failure = Some((dep.title().to_string(), err.clone()));
            }
        }
    }

    match first_failure {
        Some((dependency, cause)) => Err(TaskError::DependencyFailed {
            task: title.to_string(),
            dependency,
            cause: Box::new(cause),
        }),
        None => Ok(()),
    }
}
