// src/handle.rs

//! Task handles: created at registration, completed by the engine.
//!
//! Each task owns a [`TaskSlot`] holding a `watch` channel of its
//! [`TaskState`]. Dependency waiters, typed [`TaskHandle`]s and untyped
//! [`TaskRef`]s all observe the same channel, so a state change is visible to
//! every observer without polling.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::engine::TaskName;
use crate::errors::{CancelStage, TaskError};
use crate::sync::lock;

/// Lifecycle of a single task within a generation.
#[derive(Debug, Clone)]
pub enum TaskState {
    /// Registered; the run has not reached this task yet.
    Created,
    /// Waiting for resolved dependencies to reach a terminal state.
    Waiting,
    /// Body is executing.
    Running,
    Succeeded,
    Failed(TaskError),
    Cancelled(TaskError),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed(_) | TaskState::Cancelled(_)
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Succeeded)
    }

    /// Terminal fault, for both failed and cancelled tasks.
    pub fn error(&self) -> Option<&TaskError> {
        match self {
            TaskState::Failed(e) | TaskState::Cancelled(e) => Some(e),
            _ => None,
        }
    }

    /// Map a terminal outcome onto the matching state.
    pub(crate) fn from_outcome(outcome: &Result<(), TaskError>) -> Self {
        match outcome {
            Ok(()) => TaskState::Succeeded,
            Err(e) if e.is_cancellation() => TaskState::Cancelled(e.clone()),
            Err(e) => TaskState::Failed(e.clone()),
        }
    }
}

/// Untyped completion state shared by every observer of a task.
#[derive(Debug)]
pub(crate) struct TaskSlot {
    title: Arc<str>,
    state: watch::Sender<TaskState>,
}

impl TaskSlot {
    pub(crate) fn new(title: &str) -> Arc<Self> {
        let (state, _) = watch::channel(TaskState::Created);
        Arc::new(Self {
            title: Arc::from(title),
            state,
        })
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn shared_title(&self) -> Arc<str> {
        Arc::clone(&self.title)
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state.borrow().clone()
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.send_replace(state);
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }

    /// Cancel a task that will never be scheduled (reset before run).
    pub(crate) fn abandon(&self) {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = TaskState::Cancelled(TaskError::Cancelled {
                task: self.title.to_string(),
                stage: CancelStage::BeforeStart,
            });
            true
        });
    }

    /// Fail a task whose supervisor unwound before publishing an outcome.
    pub(crate) fn fail_unfinished(&self, message: &str) {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = TaskState::Failed(TaskError::Panicked {
                task: self.title.to_string(),
                message: message.to_string(),
            });
            true
        });
    }

    /// Wait until the task reaches a terminal state and return it.
    pub(crate) async fn wait_terminal(&self) -> TaskState {
        let mut rx = self.subscribe();
        match rx.wait_for(TaskState::is_terminal).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so it cannot be dropped while we
            // wait; treat closure as cancellation regardless.
            Err(_) => TaskState::Cancelled(TaskError::Cancelled {
                task: self.title.to_string(),
                stage: CancelStage::BeforeStart,
            }),
        }
    }
}

/// Untyped view of a registered task.
#[derive(Debug, Clone)]
pub struct TaskRef {
    slot: Arc<TaskSlot>,
}

impl TaskRef {
    pub(crate) fn new(slot: Arc<TaskSlot>) -> Self {
        Self { slot }
    }

    pub fn title(&self) -> &str {
        self.slot.title()
    }

    pub fn state(&self) -> TaskState {
        self.slot.state()
    }

    /// Await the terminal state and report success or the task's fault.
    pub async fn wait_done(&self) -> Result<(), TaskError> {
        match self.slot.wait_terminal().await.error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Receiver that yields every state change.
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.slot.subscribe()
    }
}

/// Typed handle returned by registration.
pub struct TaskHandle<T> {
    slot: Arc<TaskSlot>,
    value: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("title", &self.slot.title())
            .field("state", &self.slot.state())
            .finish()
    }
}

impl<T: Send + 'static> TaskHandle<T> {
    pub(crate) fn new(slot: Arc<TaskSlot>, value: Arc<Mutex<Option<T>>>) -> Self {
        Self { slot, value }
    }

    pub fn title(&self) -> &str {
        self.slot.title()
    }

    pub fn state(&self) -> TaskState {
        self.slot.state()
    }

    pub fn task_ref(&self) -> TaskRef {
        TaskRef::new(Arc::clone(&self.slot))
    }

    pub async fn wait_done(&self) -> Result<(), TaskError> {
        self.task_ref().wait_done().await
    }

    /// Take the produced value out of the handle, leaving `None` behind.
    pub fn take(&self) -> Option<T> {
        lock(&self.value).take()
    }
}

impl<T: Clone + Send + 'static> TaskHandle<T> {
    /// Await completion and return a clone of the produced value.
    pub async fn wait(&self) -> Result<T, TaskError> {
        self.wait_done().await?;
        lock(&self.value).clone().ok_or_else(|| TaskError::Failed {
            task: self.title().to_string(),
            error: Arc::new(anyhow::anyhow!("result was already taken from the handle")),
        })
    }
}
