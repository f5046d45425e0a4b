//! Spindle domain types shared between the selection and drive crates.
//!
//! - [`types`] - Identifiers, capabilities, run state and runtime data
//! - [`registry`] - `SpindleRegistry` trait implemented by the runtime core
//! - [`alarm`] - Fatal drive alarms and the `AlarmSink` trait
//! - [`config`] - Selection, VFD and drive configuration sections

pub mod alarm;
pub mod config;
pub mod registry;
pub mod types;
