// src/lib.rs

//! In-process dependency-graph task scheduler.
//!
//! ```no_run
//! use depsched::{Scheduler, WorkItem};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let scheduler = Scheduler::new();
//! scheduler.register("fetch", WorkItem::action(|| Ok(())), &[])?;
//! let build = scheduler.register("build", WorkItem::action(|| Ok(42)), &["fetch"])?;
//!
//! scheduler.run_tasks()?.wait().await?;
//! assert_eq!(build.wait().await?, 42);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod handle;
pub mod logging;
pub mod types;
pub mod work;

mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

pub use crate::cancel::{CancelSignal, CancelState, Cancelled};
pub use crate::dag::Scheduler;
pub use crate::engine::{RunHandle, RunOutcome, RunPhase, RunReport, TaskName};
pub use crate::errors::{CancelStage, RunError, SchedulerError, TaskError};
pub use crate::exec::{Executor, TokioExecutor};
pub use crate::handle::{TaskHandle, TaskRef, TaskState};
pub use crate::types::SchedulerOptions;
pub use crate::work::{NoProgress, ProgressSink, WorkContext, WorkItem};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::exec::shell_command;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task-file loading
/// - scheduler construction and task registration
/// - delayed cancellation and Ctrl-C handling
/// - waiting for the run and reporting failures
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    let scheduler = Arc::new(Scheduler::with_options(cfg.scheduler.options));
    register_tasks(&scheduler, &cfg)?;

    if args.dry_run {
        print_dry_run(&scheduler, &cfg);
        return Ok(());
    }

    let handle = scheduler.run_tasks()?;

    if let Some(ms) = args.cancel_after_ms.or(cfg.scheduler.cancel_after_ms) {
        info!(cancel_after_ms = ms, "arming delayed cancellation");
        scheduler.request_cancellation_after(Duration::from_millis(ms))?;
    }

    // Ctrl-C → cooperative cancellation of the whole run.
    {
        let scheduler = Arc::clone(&scheduler);
        let signal = scheduler.signal();
        tokio::spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        eprintln!("failed to listen for Ctrl+C: {e}");
                        return;
                    }
                    warn!("Ctrl+C received; requesting cancellation");
                    scheduler.request_cancellation();
                }
                _ = signal.cancelled() => {}
            }
        });
    }

    match handle.wait().await {
        Ok(report) => {
            info!(
                tasks = report.order.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "all tasks completed"
            );
            Ok(())
        }
        Err(err) => {
            for failure in err.failures() {
                error!(task = %failure.task(), "{failure}");
            }
            Err(err.into())
        }
    }
}

/// Register every `[task.<name>]` of the file as a shell-command task.
pub fn register_tasks<E: Executor>(scheduler: &Scheduler<E>, cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let deps: Vec<&str> = task.after.iter().map(String::as_str).collect();
        scheduler.register(name, shell_command(task.cmd.clone()), &deps)?;
    }
    Ok(())
}

/// Print the execution plan without running anything.
fn print_dry_run<E: Executor>(scheduler: &Scheduler<E>, cfg: &ConfigFile) {
    println!("depsched dry-run");
    println!(
        "  scheduler.ignore_missing_dependencies = {}",
        cfg.scheduler.options.ignore_missing_dependencies
    );
    match cfg.scheduler.options.max_concurrency {
        Some(n) => println!("  scheduler.max_concurrency = {n}"),
        None => println!("  scheduler.max_concurrency = unbounded"),
    }
    println!();

    match scheduler.plan() {
        Ok(order) => {
            println!("execution order ({}):", order.len());
            for (i, name) in order.iter().enumerate() {
                println!("  {}. {name}", i + 1);
                if let Some(task) = cfg.task.get(name) {
                    println!("      cmd: {}", task.cmd);
                    if !task.after.is_empty() {
                        println!("      after: {:?}", task.after);
                    }
                }
            }
        }
        Err(err) => println!("plan rejected: {err}"),
    }
}
