// src/engine/mod.rs

//! Execution engine.
//!
//! Given the topologically sorted tasks of one generation, the engine spawns
//! one *waiter* per task:
//! - the waiter awaits every resolved dependency's terminal state (aborting
//!   if the generation's signal fires),
//! - fails with the dependency's fault if any dependency did not succeed,
//! - otherwise submits the body to the [`Executor`](crate::exec::Executor).
//!
//! The [`RunHandle`] resolves once every waiter is terminal, collecting all
//! task faults rather than stopping at the first.
//!
//! - [`waiter`] holds the per-task supervision logic.
//! - [`run`] holds the run-level aggregation and the public [`RunHandle`].

/// Canonical task title type used throughout the crate.
pub type TaskName = String;

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    /// At least one task failed, or the graph was rejected.
    Failed,
    /// Every task fault was a cancellation.
    Cancelled,
}

/// Lifecycle of one scheduler generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Accepting registrations.
    Idle,
    Running,
    Terminal(RunOutcome),
}

pub mod run;
pub mod waiter;

pub use run::{RunHandle, RunReport};
