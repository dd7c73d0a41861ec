// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::ConfigError;

/// Read and deserialize a task file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile, ConfigError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Read, deserialize and validate a task file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let raw = load_from_path(path)?;
    ConfigFile::try_from(raw)
}

/// Same as [`load_and_validate`] for in-memory TOML.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile, ConfigError> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// `Depsched.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Depsched.toml")
}
