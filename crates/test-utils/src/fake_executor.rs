use std::sync::{Arc, Mutex};

use depsched::cancel::CancelSignal;
use depsched::exec::{Executor, Job, JobOutcome, TokioExecutor};
use depsched::work::BoxFuture;

/// Executor that records the title of every submitted job, then delegates to
/// a [`TokioExecutor`].
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    inner: TokioExecutor,
    submitted: Arc<Mutex<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(max_concurrency: usize) -> Self {
        Self {
            inner: TokioExecutor::bounded(max_concurrency),
            submitted: Arc::default(),
        }
    }

    /// Titles in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Executor for RecordingExecutor {
    fn submit(&self, job: Job, signal: CancelSignal) -> BoxFuture<JobOutcome> {
        self.submitted.lock().unwrap().push(job.title().to_string());
        self.inner.submit(job, signal)
    }
}

/// Executor that never runs anything and reports every job as rejected.
#[derive(Debug, Clone, Default)]
pub struct RejectingExecutor {
    seen: Arc<Mutex<Vec<String>>>,
}

impl RejectingExecutor {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Executor for RejectingExecutor {
    fn submit(&self, job: Job, _signal: CancelSignal) -> BoxFuture<JobOutcome> {
        self.seen.lock().unwrap().push(job.title().to_string());
        Box::pin(async { JobOutcome::Rejected })
    }
}
