// src/work.rs

//! Units of work that can be registered with the scheduler.
//!
//! Every shape is normalised into "given a [`WorkContext`], produce a value or
//! fail". The simpler constructors just ignore the parts of the context they
//! don't need:
//!
//! | constructor                   | body receives                  |
//! |-------------------------------|--------------------------------|
//! | [`WorkItem::action`]          | nothing                        |
//! | [`WorkItem::cancellable`]     | the cancellation signal        |
//! | [`WorkItem::with_progress`]   | signal + progress sink         |
//! | [`WorkItem::blocking`]        | the full context               |
//! | [`WorkItem::from_async`]      | the full context (async body)  |
//!
//! Synchronous bodies are run on a blocking-capable thread by the executor;
//! async bodies are polled on the runtime.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::cancel::{CancelSignal, Cancelled};

/// Boxed, sendable future used across the executor seam.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Receiver of integer progress reports from a running task.
pub trait ProgressSink: Send + Sync {
    fn report(&self, value: i32);
}

impl<F> ProgressSink for F
where
    F: Fn(i32) + Send + Sync,
{
    fn report(&self, value: i32) {
        self(value)
    }
}

/// Sink used when a task was registered without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _value: i32) {}
}

/// Everything a task body may observe while it runs.
#[derive(Clone)]
pub struct WorkContext {
    title: Arc<str>,
    signal: CancelSignal,
    progress: Arc<dyn ProgressSink>,
}

impl fmt::Debug for WorkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkContext")
            .field("title", &self.title)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl WorkContext {
    pub(crate) fn new(
        title: Arc<str>,
        signal: CancelSignal,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            title,
            signal,
            progress,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    pub fn progress(&self) -> &dyn ProgressSink {
        self.progress.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Safe point for bodies: `ctx.check_cancelled()?`.
    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        self.signal.check()
    }

    pub async fn cancelled(&self) {
        self.signal.cancelled().await
    }

    pub fn report(&self, value: i32) {
        self.progress.report(value)
    }
}

pub(crate) type BlockingBody<T> = Box<dyn FnOnce(WorkContext) -> anyhow::Result<T> + Send>;
pub(crate) type AsyncBody<T> =
    Box<dyn FnOnce(WorkContext) -> BoxFuture<anyhow::Result<T>> + Send>;

pub(crate) enum Body<T> {
    Blocking(BlockingBody<T>),
    Async(AsyncBody<T>),
}

/// A deferred unit of work producing `T`.
///
/// Nothing runs until the scheduler submits the item after its dependencies
/// succeeded.
pub struct WorkItem<T> {
    pub(crate) body: Body<T>,
    pub(crate) progress: Option<Arc<dyn ProgressSink>>,
}

impl<T> fmt::Debug for WorkItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            Body::Blocking(_) => "blocking",
            Body::Async(_) => "async",
        };
        f.debug_struct("WorkItem")
            .field("kind", &kind)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

impl<T: Send + 'static> WorkItem<T> {
    /// Plain closure. Use `T = ()` for work without a result.
    pub fn action<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        Self::blocking(move |_ctx| f())
    }

    /// Closure that polls the generation's cancellation signal.
    pub fn cancellable<F>(f: F) -> Self
    where
        F: FnOnce(&CancelSignal) -> anyhow::Result<T> + Send + 'static,
    {
        Self::blocking(move |ctx| f(ctx.signal()))
    }

    /// Closure that polls cancellation and reports progress to `sink`.
    pub fn with_progress<F>(sink: Arc<dyn ProgressSink>, f: F) -> Self
    where
        F: FnOnce(&CancelSignal, &dyn ProgressSink) -> anyhow::Result<T> + Send + 'static,
    {
        Self::blocking(move |ctx| f(ctx.signal(), ctx.progress())).progress_sink(sink)
    }

    /// Synchronous body receiving the full [`WorkContext`].
    pub fn blocking<F>(f: F) -> Self
    where
        F: FnOnce(WorkContext) -> anyhow::Result<T> + Send + 'static,
    {
        Self {
            body: Body::Blocking(Box::new(f)),
            progress: None,
        }
    }

    /// Asynchronous body receiving the full [`WorkContext`].
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: FnOnce(WorkContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            body: Body::Async(Box::new(move |ctx| Box::pin(f(ctx)))),
            progress: None,
        }
    }

    /// Attach (or replace) the progress sink handed to the body.
    pub fn progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self.body, Body::Blocking(_))
    }
}
