// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The engine never runs task bodies itself. Once a task's dependencies have
//! succeeded, its body is packaged as a [`Job`] and handed to an
//! [`Executor`] together with the generation's [`CancelSignal`].
//!
//! - [`TokioExecutor`](super::TokioExecutor) is the default implementation.
//! - Tests can wrap or replace it, e.g. to record submission order or to
//!   refuse work.

use std::fmt;

use crate::cancel::CancelSignal;
use crate::work::BoxFuture;

/// Type-erased body of a task, ready to run.
///
/// The typed result has already been wired to the task's handle; the job
/// itself only reports success or failure.
pub enum JobKind {
    /// Synchronous body; may block the calling thread.
    Blocking(Box<dyn FnOnce() -> anyhow::Result<()> + Send>),
    /// Asynchronous body.
    Async(BoxFuture<anyhow::Result<()>>),
}

/// A task body submitted for execution.
pub struct Job {
    title: String,
    kind: JobKind,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            JobKind::Blocking(_) => "blocking",
            JobKind::Async(_) => "async",
        };
        f.debug_struct("Job")
            .field("title", &self.title)
            .field("kind", &kind)
            .finish()
    }
}

impl Job {
    pub(crate) fn new(title: impl Into<String>, kind: JobKind) -> Self {
        Self {
            title: title.into(),
            kind,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self.kind, JobKind::Blocking(_))
    }

    pub fn into_kind(self) -> JobKind {
        self.kind
    }
}

/// Terminal outcome of a submitted job, as reported by an executor.
#[derive(Debug)]
pub enum JobOutcome {
    Completed,
    /// The body returned an error. A body that returned
    /// [`Cancelled`](crate::cancel::Cancelled) lands here too; the engine
    /// classifies it.
    Failed(anyhow::Error),
    Panicked(String),
    /// The executor declined to start the body because the signal had fired.
    Rejected,
}

/// Capability that runs task bodies asynchronously.
///
/// Implementations decide *where* a body runs (thread pool, runtime,
/// bounded queue, ...) and may refuse to start work once `signal` has fired.
/// They must not start a job more than once.
pub trait Executor: Send + Sync + 'static {
    fn submit(&self, job: Job, signal: CancelSignal) -> BoxFuture<JobOutcome>;
}

impl<E: Executor + ?Sized> Executor for std::sync::Arc<E> {
    fn submit(&self, job: Job, signal: CancelSignal) -> BoxFuture<JobOutcome> {
        (**self).submit(job, signal)
    }
}
