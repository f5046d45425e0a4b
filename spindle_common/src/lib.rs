//! Spindle Common Library
//!
//! Shared types, constants and configuration loading utilities for all
//! spindle workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Slot capacity, retry bounds and other numeric limits
//! - [`config`] - Configuration loading traits and types
//! - [`spindle`] - Spindle identifiers, runtime data and collaborator traits
//! - [`hooks`] - Ordered listener chains for firmware notifications
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use spindle_common::consts::MAX_SPINDLE_SLOTS;
//! use spindle_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod hooks;
pub mod prelude;
pub mod spindle;
