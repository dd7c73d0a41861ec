// src/types.rs

use serde::Deserialize;

/// Scheduler-wide behaviour switches.
///
/// Can be built in code or deserialized from the `[scheduler]` section of a
/// task file:
///
/// ```toml
/// [scheduler]
/// ignore_missing_dependencies = true
/// max_concurrency = 4
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct SchedulerOptions {
    /// Drop dependency names that match no registered task instead of
    /// failing the run.
    #[serde(default)]
    pub ignore_missing_dependencies: bool,

    /// Upper bound on concurrently running task bodies for the default
    /// executor. `None` means unbounded.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl SchedulerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_missing_dependencies(mut self, ignore: bool) -> Self {
        self.ignore_missing_dependencies = ignore;
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }
}
