// src/exec/tokio_backend.rs

//! Default executor backed by the tokio runtime.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::exec::backend::{Executor, Job, JobKind, JobOutcome};
use crate::types::SchedulerOptions;
use crate::work::BoxFuture;

/// Runs blocking jobs on `spawn_blocking` and async jobs on `tokio::spawn`.
///
/// With [`TokioExecutor::bounded`], at most `n` bodies execute at the same
/// time; jobs beyond that wait for a permit (and give up if the signal fires
/// while they wait).
#[derive(Debug, Clone, Default)]
pub struct TokioExecutor {
    permits: Option<Arc<Semaphore>>,
}

impl TokioExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit concurrently running bodies to `max_concurrency` (at least 1).
    pub fn bounded(max_concurrency: usize) -> Self {
        Self {
            permits: Some(Arc::new(Semaphore::new(max_concurrency.max(1)))),
        }
    }

    pub fn from_options(options: &SchedulerOptions) -> Self {
        match options.max_concurrency {
            Some(n) => Self::bounded(n),
            None => Self::new(),
        }
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, job: Job, signal: CancelSignal) -> BoxFuture<JobOutcome> {
        let permits = self.permits.clone();

        Box::pin(async move {
            let _permit = match permits {
                Some(semaphore) => tokio::select! {
                    biased;
                    _ = signal.cancelled() => {
                        debug!(task = %job.title(), "cancelled while waiting for an executor slot");
                        return JobOutcome::Rejected;
                    }
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => return JobOutcome::Rejected,
                    },
                },
                None => None,
            };

            if signal.is_cancelled() {
                debug!(task = %job.title(), "signal already fired; refusing to start body");
                return JobOutcome::Rejected;
            }

            let title = job.title().to_string();
            let joined = match job.into_kind() {
                JobKind::Blocking(body) => tokio::task::spawn_blocking(body).await,
                JobKind::Async(fut) => tokio::spawn(fut).await,
            };

            match joined {
                Ok(Ok(())) => JobOutcome::Completed,
                Ok(Err(err)) => JobOutcome::Failed(err),
                Err(join_err) if join_err.is_panic() => {
                    JobOutcome::Panicked(panic_message(join_err.into_panic()))
                }
                Err(join_err) => {
                    debug!(task = %title, error = %join_err, "job was aborted by the runtime");
                    JobOutcome::Failed(anyhow::Error::new(join_err))
                }
            }
        })
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
