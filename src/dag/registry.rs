// src/dag/registry.rs

//! Task registry: title -> task record, for one generation.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::cancel::CancelSignal;
use crate::engine::TaskName;
use crate::errors::{Result, SchedulerError};
use crate::exec::backend::{Job, JobKind};
use crate::handle::{TaskHandle, TaskRef, TaskSlot, TaskState};
use crate::sync::lock;
use crate::work::{Body, NoProgress, ProgressSink, WorkContext, WorkItem};

/// Turns the deferred work into a runnable [`Job`] bound to a signal.
pub(crate) type JobFactory = Box<dyn FnOnce(CancelSignal) -> Job + Send>;

/// A registered task.
pub(crate) struct TaskRecord {
    pub slot: Arc<TaskSlot>,
    /// Dependency titles as given at registration.
    pub declared: Vec<TaskName>,
    /// `Arc<Mutex<Option<T>>>` behind `dyn Any`, for typed lookups.
    value: Arc<dyn Any + Send + Sync>,
    /// Taken when the run starts.
    job: Option<JobFactory>,
}

/// Record handed to the run: owned, detached from the registry.
pub(crate) struct RunEntry {
    pub slot: Arc<TaskSlot>,
    pub declared: Vec<TaskName>,
    pub job: Option<JobFactory>,
}

#[derive(Default)]
pub(crate) struct Registry {
    tasks: BTreeMap<TaskName, TaskRecord>,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn titles(&self) -> Vec<TaskName> {
        self.tasks.keys().cloned().collect()
    }

    /// Insert a new task. Title validity and uniqueness are checked here;
    /// run-state checks are the caller's job.
    pub fn register<T: Send + 'static>(
        &mut self,
        title: &str,
        work: WorkItem<T>,
        dependencies: &[&str],
    ) -> Result<TaskHandle<T>> {
        if title.trim().is_empty() {
            return Err(SchedulerError::InvalidTitle(title.to_string()));
        }
        if self.tasks.contains_key(title) {
            return Err(SchedulerError::DuplicateTitle(title.to_string()));
        }

        let slot = TaskSlot::new(title);
        let value: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        let job = job_factory(Arc::clone(&slot), work, Arc::clone(&value));

        let declared: Vec<TaskName> = dependencies.iter().map(|d| d.to_string()).collect();
        debug!(task = %title, deps = ?declared, "registered task");

        self.tasks.insert(
            title.to_string(),
            TaskRecord {
                slot: Arc::clone(&slot),
                declared,
                value: value.clone(),
                job: Some(job),
            },
        );

        Ok(TaskHandle::new(slot, value))
    }

    pub fn lookup(&self, title: &str) -> Option<TaskRef> {
        self.tasks
            .get(title)
            .map(|record| TaskRef::new(Arc::clone(&record.slot)))
    }

    /// Typed lookup; `None` if the title is unknown or `T` doesn't match the
    /// type the task was registered with.
    pub fn lookup_typed<T: Send + 'static>(&self, title: &str) -> Option<TaskHandle<T>> {
        let record = self.tasks.get(title)?;
        let value = Arc::clone(&record.value)
            .downcast::<Mutex<Option<T>>>()
            .ok()?;
        Some(TaskHandle::new(Arc::clone(&record.slot), value))
    }

    /// `(title, declared dependencies)` pairs in registry order.
    pub fn declarations(&self) -> Vec<(&str, &[TaskName])> {
        self.tasks
            .iter()
            .map(|(title, record)| (title.as_str(), record.declared.as_slice()))
            .collect()
    }

    /// Detach every record's work for a run. Records stay in place so that
    /// lookups keep working while (and after) the run executes.
    pub fn take_run_entries(&mut self) -> Vec<RunEntry> {
        self.tasks
            .values_mut()
            .map(|record| RunEntry {
                slot: Arc::clone(&record.slot),
                declared: record.declared.clone(),
                job: record.job.take(),
            })
            .collect()
    }

    /// Mark every task that never got scheduled as cancelled.
    pub fn abandon_all(&self) {
        for record in self.tasks.values() {
            record.slot.abandon();
        }
    }
}

/// Erase `T`: the produced value is stored into `value`, and the slot is moved
/// to `Running` the moment the executor actually starts the body.
fn job_factory<T: Send + 'static>(
    slot: Arc<TaskSlot>,
    work: WorkItem<T>,
    value: Arc<Mutex<Option<T>>>,
) -> JobFactory {
    Box::new(move |signal: CancelSignal| {
        let progress = work
            .progress
            .unwrap_or_else(|| Arc::new(NoProgress) as Arc<dyn ProgressSink>);
        let ctx = WorkContext::new(slot.shared_title(), signal, progress);
        let title = slot.title().to_string();

        let kind = match work.body {
            Body::Blocking(body) => JobKind::Blocking(Box::new(move || {
                slot.set_state(TaskState::Running);
                let produced = body(ctx)?;
                *lock(&value) = Some(produced);
                Ok(())
            })),
            Body::Async(body) => JobKind::Async(Box::pin(async move {
                slot.set_state(TaskState::Running);
                let produced = body(ctx).await?;
                *lock(&value) = Some(produced);
                Ok(())
            })),
        };

        Job::new(title, kind)
    })
}
