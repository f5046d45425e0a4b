//! Runtime core errors.

use spindle_common::config::ConfigError;
use spindle_common::spindle::registry::SelectError;
use spindle_select::StoreError;
use thiserror::Error;

use crate::core::Phase;

/// Error types for spindle core operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Startup could not complete.
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation not allowed in the current startup phase.
    #[error("Operation requires phase {expected:?}, core is {actual:?}")]
    InvalidPhase {
        /// Phase the operation needs.
        expected: Phase,
        /// Current phase.
        actual: Phase,
    },

    /// Spindle activation failed.
    #[error(transparent)]
    Select(#[from] SelectError),

    /// Binding table persistence failed.
    #[error("State persistence error: {0}")]
    PersistenceError(String),
}

impl From<ConfigError> for HalError {
    fn from(e: ConfigError) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<StoreError> for HalError {
    fn from(e: StoreError) -> Self {
        Self::PersistenceError(e.to_string())
    }
}
