// src/cancel.rs

//! Per-generation cooperative cancellation.
//!
//! A [`CancelSignal`] is created for each scheduler generation and handed to
//! every dependency waiter, every executor submission and every task body.
//! Firing is idempotent and monotonic: once cancelled, a signal stays
//! cancelled. A fresh signal is only obtained by resetting the scheduler.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::SchedulerError;
use crate::sync::lock;

/// Marker error returned by [`CancelSignal::check`].
///
/// Task bodies propagate it with `?`; the engine recognises it and records the
/// task as cooperatively cancelled instead of failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation was cancelled")]
pub struct Cancelled;

/// Observable state of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    NotRequested,
    /// A delayed cancellation is armed and will fire at the given instant.
    RequestedAt(Instant),
    Requested,
}

#[derive(Debug)]
struct SignalInner {
    generation: u64,
    token: CancellationToken,
    /// Most recent `cancel_after` request: its deadline and the child token
    /// that stops its timer. Re-arming cancels the previous timer.
    timer: Mutex<Option<ArmedTimer>>,
}

#[derive(Debug)]
struct ArmedTimer {
    deadline: Instant,
    stop: CancellationToken,
}

/// Shared, thread-safe cancellation flag for one generation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    inner: Arc<SignalInner>,
}

impl CancelSignal {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                generation,
                token: CancellationToken::new(),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Generation this signal belongs to.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Return `Err(Cancelled)` once the signal has fired.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Completes when the signal fires.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    pub fn state(&self) -> CancelState {
        if self.is_cancelled() {
            return CancelState::Requested;
        }
        match lock(&self.inner.timer).as_ref() {
            Some(timer) => CancelState::RequestedAt(timer.deadline),
            None => CancelState::NotRequested,
        }
    }

    /// Underlying token, for bodies that want to derive child tokens.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    pub(crate) fn cancel(&self) {
        if !self.inner.token.is_cancelled() {
            debug!(generation = self.inner.generation, "cancellation requested");
        }
        self.inner.token.cancel();
    }

    /// Arm a delayed cancellation measured from now.
    ///
    /// A later call replaces the pending deadline and stops the earlier timer
    /// task. Every timer task exits early when the signal fires for any other
    /// reason (including a reset).
    pub(crate) fn cancel_after(&self, delay: Duration) -> Result<(), SchedulerError> {
        if self.is_cancelled() {
            return Ok(());
        }
        if delay.is_zero() {
            self.cancel();
            return Ok(());
        }

        let runtime =
            Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        let deadline = Instant::now() + delay;
        // Child of the generation token: stops on re-arm and on cancellation.
        let stop = self.inner.token.child_token();
        let previous = lock(&self.inner.timer).replace(ArmedTimer {
            deadline,
            stop: stop.clone(),
        });
        if let Some(previous) = previous {
            previous.stop.cancel();
        }
        debug!(
            generation = self.inner.generation,
            delay_ms = delay.as_millis() as u64,
            "delayed cancellation armed"
        );

        let signal = self.clone();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => signal.cancel(),
            }
        });

        Ok(())
    }
}
