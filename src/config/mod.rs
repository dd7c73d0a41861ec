// src/config/mod.rs

//! Task-file loading and validation for the `depsched` CLI.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a task file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//!
//! Graph-level problems (unknown dependencies, cycles) are left to the
//! scheduler, which reports them through the run handle.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_and_validate};
pub use model::{ConfigFile, RawConfigFile, SchedulerSection, TaskConfig};
