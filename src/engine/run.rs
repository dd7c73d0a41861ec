// src/engine/run.rs

//! Run-level orchestration and the public [`RunHandle`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cancel::CancelSignal;
use crate::dag::plan::plan_run;
use crate::dag::registry::RunEntry;
use crate::engine::waiter::{supervise, PlannedTask};
use crate::engine::{RunOutcome, RunPhase, TaskName};
use crate::errors::{RunError, TaskError};
use crate::exec::backend::Executor;
use crate::exec::tokio_backend::panic_message;

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub generation: u64,
    /// Task titles in the order their waiters were spawned.
    pub order: Vec<TaskName>,
    pub elapsed: Duration,
}

/// Handle to an in-flight run.
///
/// Awaiting [`RunHandle::wait`] returns only after every task of the run has
/// reached a terminal state.
#[derive(Debug)]
pub struct RunHandle {
    generation: u64,
    join: JoinHandle<Result<RunReport, RunError>>,
}

impl RunHandle {
    pub(crate) fn new(generation: u64, join: JoinHandle<Result<RunReport, RunError>>) -> Self {
        Self { generation, join }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn wait(self) -> Result<RunReport, RunError> {
        match self.join.await {
            Ok(result) => result,
            Err(join_err) => Err(RunError::Aborted(join_err.to_string())),
        }
    }
}

/// Everything a spawned run needs, detached from the scheduler.
pub(crate) struct RunContext<E> {
    pub generation: u64,
    pub entries: Vec<RunEntry>,
    pub ignore_missing: bool,
    pub signal: CancelSignal,
    pub executor: Arc<E>,
    pub phase: Arc<watch::Sender<RunPhase>>,
}

/// Resolve, sort and execute one generation, then publish its outcome.
pub(crate) async fn run_generation<E: Executor>(ctx: RunContext<E>) -> Result<RunReport, RunError> {
    let RunContext {
        generation,
        entries,
        ignore_missing,
        signal,
        executor,
        phase,
    } = ctx;

    let started = Instant::now();
    info!(generation, tasks = entries.len(), "starting run");

    let slots: Vec<_> = entries.iter().map(|e| Arc::clone(&e.slot)).collect();

    let result = match plan_run(entries, ignore_missing) {
        Ok(planned) => execute(planned, signal, executor).await,
        Err(err) => {
            warn!(generation, error = %err, "run rejected before any task started");
            for slot in &slots {
                slot.abandon();
            }
            Err(err)
        }
    };

    let outcome = match &result {
        Ok(_) => RunOutcome::Succeeded,
        Err(err) if err.is_cancelled() => RunOutcome::Cancelled,
        Err(_) => RunOutcome::Failed,
    };
    phase.send_replace(RunPhase::Terminal(outcome));

    let elapsed = started.elapsed();
    match &result {
        Ok(_) => info!(
            generation,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished successfully"
        ),
        Err(err) => warn!(
            generation,
            elapsed_ms = elapsed.as_millis() as u64,
            ?outcome,
            error = %err,
            "run finished with errors"
        ),
    }

    result.map(|order| RunReport {
        generation,
        order,
        elapsed,
    })
}

/// Spawn one waiter per task, in order, and collect every fault.
async fn execute<E: Executor>(
    planned: Vec<PlannedTask>,
    signal: CancelSignal,
    executor: Arc<E>,
) -> Result<Vec<TaskName>, RunError> {
    let mut order = Vec::with_capacity(planned.len());
    let mut waiters = Vec::with_capacity(planned.len());

    for task in planned {
        let title = task.title().to_string();
        order.push(title.clone());
        let waiter = tokio::spawn(supervise(task, signal.clone(), Arc::clone(&executor)));
        waiters.push((title, waiter));
    }

    let mut failures = Vec::new();
    for (title, waiter) in waiters {
        match waiter.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => failures.push(err),
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    join_err.to_string()
                };
                failures.push(TaskError::Panicked {
                    task: title,
                    message,
                })
            }
        }
    }

    if failures.is_empty() {
        Ok(order)
    } else {
        Err(RunError::TasksFailed { failures })
    }
}
