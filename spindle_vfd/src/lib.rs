//! # Spindle VFD Library
//!
//! Drives variable-frequency spindle drives over a half-duplex Modbus link.
//!
//! ## Modules
//!
//! - [`modbus`] - request/reply model and context tags
//! - [`codec`] - command word and speed register encoding
//! - [`profile`] - register maps of supported drives
//! - [`transport`] - transport interface consumed by the controller
//! - [`controller`] - per-drive request state machine with retry and
//!   alarm escalation
//!
//! ## Ordering
//!
//! For one drive, a run/direction exchange always resolves (accepted or
//! retries exhausted) before the matching speed exchange is issued. A call
//! made while an exchange is outstanding is dropped, not queued.

pub mod codec;
pub mod controller;
pub mod modbus;
pub mod profile;
pub mod transport;

pub use crate::codec::{CommandWord, Direction, RunMode, decode_speed, encode_speed};
pub use crate::controller::{ExchangeState, VfdController};
pub use crate::modbus::{FunctionCode, ModbusReply, ModbusRequest, VfdContext};
pub use crate::profile::DriveProfile;
pub use crate::transport::{Completion, ModbusTransport, TransportError};
