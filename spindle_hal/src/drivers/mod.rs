//! Drive transport implementations.
//!
//! - [`simulation`] - Simulated Modbus bus with register-level VFD models
//!
//! # Adding New Transports
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `ModbusTransport` from `spindle_vfd::transport`
//! 3. Hand an instance to `SpindleCore::new`

pub mod simulation;
