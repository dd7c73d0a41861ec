// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::SchedulerOptions;

/// Task file as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// ignore_missing_dependencies = false
/// max_concurrency = 4
/// cancel_after_ms = 30000
///
/// [task.fetch]
/// cmd = "git fetch"
///
/// [task.build]
/// cmd = "cargo build"
/// after = ["fetch"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// All tasks from `[task.<name>]`, keyed by task title.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerSection {
    #[serde(flatten)]
    pub options: SchedulerOptions,

    /// Request cancellation this many milliseconds after the run starts.
    #[serde(default)]
    pub cancel_after_ms: Option<u64>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Tasks that must succeed before this one starts.
    #[serde(default)]
    pub after: Vec<String>,
}

/// A validated task file. Only constructible through
/// `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { scheduler, task }
    }
}
