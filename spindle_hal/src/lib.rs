//! # Spindle HAL Library
//!
//! Runtime core tying the spindle binding table and the VFD controllers to
//! a drive registry and a Modbus transport.
//!
//! # Module Structure
//!
//! - [`core`] - SpindleCore, startup phases and the service cycle
//! - [`registry`] - Physical drive registry
//! - [`config`] - Configuration file
//! - [`drivers`] - Transport implementations
//! - [`error`] - HalError
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          SpindleCore                           │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌────────────────┐  │
//! │  │ CommandGateway│──►│  DriveRegistry   │◄──│SelectionPolicy │  │
//! │  └──────┬───────┘   └────────┬─────────┘   └───────┬────────┘  │
//! │         │     BindingTable   │ selections          │           │
//! │         └────────────────────┼─────────────────────┘           │
//! │                              ▼                                 │
//! │                     ┌─────────────────┐     ┌───────────────┐  │
//! │                     │ VfdController(s)│◄───►│ModbusTransport│  │
//! │                     └─────────────────┘     └───────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod registry;

// Re-export key types for convenience
pub use crate::config::SpindleHalConfig;
pub use crate::core::{Phase, SpindleCore};
pub use crate::error::HalError;
pub use crate::registry::DriveRegistry;
