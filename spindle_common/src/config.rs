//! Spindle configuration file loading.
//!
//! A spindle process reads one TOML file. `[shared]` names the instance and
//! sets the log level; the spindle sections (`[select]`, `[vfd]`,
//! `[[drives]]`) live in [`crate::spindle::config`] and are embedded by the
//! owning binary next to it.
//!
//! # Usage
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use spindle_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use spindle_common::spindle::config::SelectConfig;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct SelectOnly {
//!     shared: SharedConfig,
//!     #[serde(default)]
//!     select: SelectConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SelectOnly::load(Path::new("/etc/spindle/spindle.toml"))?;
//!     config.shared.validate()?;
//!     config.select.validate()?;
//!     println!("{}: {} slots", config.shared.service_name, config.select.selectable_slots);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Spindle configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the configured path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// File unreadable or not valid TOML for the target type.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Parsed, but a value is out of range or inconsistent.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// `[shared] log_level`, written in lowercase.
///
/// `-v` on the command line overrides it with DEBUG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Register-level Modbus traffic.
    Trace,
    /// Retries, dropped intents, rejected commands.
    Debug,
    /// Startup, table load and spindle selection.
    #[default]
    Info,
    /// Recoverable drive or store problems.
    Warn,
    /// Drive faults.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// `[shared]` section.
///
/// ```toml
/// [shared]
/// service_name = "spindle-hal-01"
/// log_level = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Defaults to `info`.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance name used in startup logs.
    pub service_name: String,
}

impl SharedConfig {
    /// Reject an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// TOML loading for any deserializable configuration type.
///
/// Loading only parses; callers run the sections' `validate()` afterwards.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`. A missing file is `FileNotFound`, any other
    /// read or parse failure is `ParseError`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound,
            _ => ConfigError::ParseError(format!("{}: {e}", path.display())),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a TOML document already in memory.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
