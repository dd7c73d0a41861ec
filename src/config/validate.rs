// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::ConfigError;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    ensure_has_tasks(cfg)?;
    validate_scheduler_section(cfg)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.task.is_empty() {
        return Err(ConfigError::Invalid(
            "task file must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_scheduler_section(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    if cfg.scheduler.options.max_concurrency == Some(0) {
        return Err(ConfigError::Invalid(
            "[scheduler].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<(), ConfigError> {
    for (name, task) in cfg.task.iter() {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "task names must not be empty or whitespace".to_string(),
            ));
        }
        if task.cmd.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}
