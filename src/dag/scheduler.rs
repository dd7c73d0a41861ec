// src/dag/scheduler.rs

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cancel::CancelSignal;
use crate::dag::plan::resolve_and_sort;
use crate::dag::registry::Registry;
use crate::engine::run::{run_generation, RunContext};
use crate::engine::{RunHandle, RunPhase, TaskName};
use crate::errors::{Result, RunError, SchedulerError};
use crate::exec::{Executor, TokioExecutor};
use crate::handle::{TaskHandle, TaskRef};
use crate::sync::lock;
use crate::types::SchedulerOptions;
use crate::work::WorkItem;

/// One run-epoch: its tasks, its cancellation signal and its phase.
struct Generation {
    id: u64,
    registry: Registry,
    signal: CancelSignal,
    phase: Arc<watch::Sender<RunPhase>>,
}

impl Generation {
    fn new(id: u64) -> Self {
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self {
            id,
            registry: Registry::default(),
            signal: CancelSignal::new(id),
            phase: Arc::new(phase),
        }
    }

    fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }
}

/// Dependency-aware task scheduler.
///
/// Register tasks with [`register`](Self::register), then start them all with
/// [`run_tasks`](Self::run_tasks). Each task starts as soon as all of its
/// dependencies have succeeded; independent tasks run concurrently.
///
/// A scheduler runs once per *generation*. [`reset`](Self::reset) cancels the
/// current generation and starts an empty one, making the instance reusable.
///
/// All methods take `&self`; registration and lifecycle changes are
/// serialised by an internal lock, which is never held across an await.
pub struct Scheduler<E: Executor = TokioExecutor> {
    current: Mutex<Generation>,
    executor: Arc<E>,
    options: SchedulerOptions,
}

impl Scheduler<TokioExecutor> {
    pub fn new() -> Self {
        Self::with_options(SchedulerOptions::default())
    }

    /// Scheduler on the default executor, bounded by
    /// `options.max_concurrency` if set.
    pub fn with_options(options: SchedulerOptions) -> Self {
        Self::with_executor(options, TokioExecutor::from_options(&options))
    }
}

impl Default for Scheduler<TokioExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Executor> Scheduler<E> {
    pub fn with_executor(options: SchedulerOptions, executor: E) -> Self {
        Self {
            current: Mutex::new(Generation::new(1)),
            executor: Arc::new(executor),
            options,
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Identifier of the current generation (starts at 1).
    pub fn generation(&self) -> u64 {
        self.lock().id
    }

    pub fn phase(&self) -> RunPhase {
        self.lock().phase()
    }

    /// The current generation's cancellation signal.
    pub fn signal(&self) -> CancelSignal {
        self.lock().signal.clone()
    }

    /// Register a task.
    ///
    /// The returned handle is not started; it completes once the task has
    /// run (or failed / been cancelled) during [`run_tasks`](Self::run_tasks).
    pub fn register<T: Send + 'static>(
        &self,
        title: &str,
        work: WorkItem<T>,
        dependencies: &[&str],
    ) -> Result<TaskHandle<T>> {
        let mut current = self.lock();
        if current.phase() != RunPhase::Idle {
            return Err(SchedulerError::AlreadyRun {
                generation: current.id,
            });
        }
        current.registry.register(title, work, dependencies)
    }

    pub fn try_get_task(&self, title: &str) -> Option<TaskRef> {
        self.lock().registry.lookup(title)
    }

    /// Typed lookup. `None` if no task has that title or it was registered
    /// with a different result type.
    pub fn try_get_task_handle<T: Send + 'static>(&self, title: &str) -> Option<TaskHandle<T>> {
        self.lock().registry.lookup_typed(title)
    }

    pub fn task_titles(&self) -> Vec<TaskName> {
        self.lock().registry.titles()
    }

    /// Resolve and sort the registered tasks without running anything.
    ///
    /// Returns the titles in a valid execution order, or the graph error
    /// [`run_tasks`](Self::run_tasks) would report.
    pub fn plan(&self) -> std::result::Result<Vec<TaskName>, RunError> {
        let current = self.lock();
        let declarations = current.registry.declarations();
        let resolved =
            resolve_and_sort(&declarations, self.options.ignore_missing_dependencies)?;
        Ok(resolved
            .order
            .into_iter()
            .map(|i| declarations[i].0.to_string())
            .collect())
    }

    /// Start the current generation.
    ///
    /// Must be called from within a tokio runtime. Graph errors (missing
    /// dependencies, cycles) are reported through the returned handle, before
    /// any task body runs.
    pub fn run_tasks(&self) -> Result<RunHandle> {
        let mut current = self.lock();
        if current.phase() != RunPhase::Idle {
            return Err(SchedulerError::AlreadyRun {
                generation: current.id,
            });
        }

        let runtime =
            Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        current.phase.send_replace(RunPhase::Running);
        info!(
            generation = current.id,
            tasks = current.registry.len(),
            "run requested"
        );

        let ctx = RunContext {
            generation: current.id,
            entries: current.registry.take_run_entries(),
            ignore_missing: self.options.ignore_missing_dependencies,
            signal: current.signal.clone(),
            executor: Arc::clone(&self.executor),
            phase: Arc::clone(&current.phase),
        };

        let join = runtime.spawn(run_generation(ctx));
        Ok(RunHandle::new(current.id, join))
    }

    /// Fire the current generation's signal now.
    pub fn request_cancellation(&self) {
        self.lock().signal.cancel();
    }

    /// Fire the current generation's signal after `delay`.
    ///
    /// A later request replaces a pending one. A reset disarms it.
    pub fn request_cancellation_after(&self, delay: Duration) -> Result<()> {
        self.lock().signal.cancel_after(delay)
    }

    /// Cancel the current generation and start a fresh, empty one.
    ///
    /// In-flight waiters and bodies of the old generation observe
    /// cancellation; tasks that were never run are marked cancelled.
    pub fn reset(&self) {
        let mut current = self.lock();
        current.signal.cancel();
        if current.phase() == RunPhase::Idle {
            current.registry.abandon_all();
        }

        let next = current.id + 1;
        debug!(from = current.id, to = next, "resetting scheduler");
        *current = Generation::new(next);
    }

    /// Reset and drop the scheduler.
    pub fn dispose(self) {
        self.reset();
    }

    fn lock(&self) -> MutexGuard<'_, Generation> {
        lock(&self.current)
    }
}

impl<E: Executor> Drop for Scheduler<E> {
    fn drop(&mut self) {
        let current = self.lock();
        current.signal.cancel();
        if current.phase() == RunPhase::Idle {
            current.registry.abandon_all();
        }
    }
}
