//! Simulation transport module.
//!
//! Provides a software Modbus bus for development and testing without a
//! serial line or physical drives.

mod bus;
mod drive;

pub use bus::SimulatedBus;
pub use drive::{Fault, SimulatedDrive};
