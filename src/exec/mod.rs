// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] defines the [`Executor`] trait the engine submits jobs to.
//! - [`tokio_backend`] provides [`TokioExecutor`], the default executor.
//! - [`command`] builds work items that run shell commands, used by the CLI.

pub mod backend;
pub mod command;
pub mod tokio_backend;

pub use backend::{Executor, Job, JobKind, JobOutcome};
pub use command::shell_command;
pub use tokio_backend::TokioExecutor;
