// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `depsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "depsched",
    version,
    about = "Run a dependency graph of shell commands as concurrently as possible.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Depsched.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEPSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and order the tasks, print the plan, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Request cancellation this many milliseconds after the run starts.
    ///
    /// Overrides `[scheduler].cancel_after_ms` from the task file.
    #[arg(long, value_name = "MS")]
    pub cancel_after_ms: Option<u64>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
