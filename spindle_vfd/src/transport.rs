//! Transport interface.
//!
//! The transport owns framing, CRC and the serial line. It offers a
//! blocking exchange and a queued submit whose outcome is reported later
//! as a [`Completion`]. Every submitted request completes exactly once,
//! either with a reply or with an exception; a timeout is reported as an
//! exception with code [`TIMEOUT_EXCEPTION`].

use thiserror::Error;

use crate::modbus::{ModbusReply, ModbusRequest};

/// Exception code reported for a request that got no reply.
pub const TIMEOUT_EXCEPTION: u8 = 0;

/// Transport-level failure of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No reply within the transport timeout.
    #[error("No reply from drive")]
    Timeout,

    /// Drive answered with a protocol exception.
    #[error("Drive exception code {0}")]
    Exception(u8),

    /// Another exchange is in progress.
    #[error("Transport busy")]
    Busy,

    /// Link not initialised.
    #[error("Transport down")]
    Down,
}

/// Outcome of a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Reply received.
    Reply {
        /// Unit the request was sent to.
        unit: u8,
        /// Reply frame.
        reply: ModbusReply,
    },
    /// Protocol exception or timeout.
    Exception {
        /// Unit the request was sent to.
        unit: u8,
        /// Exception code, [`TIMEOUT_EXCEPTION`] on timeout.
        code: u8,
        /// Context tag of the request.
        context: u8,
    },
}

impl Completion {
    /// Unit the completion belongs to.
    pub fn unit(&self) -> u8 {
        match self {
            Self::Reply { unit, .. } | Self::Exception { unit, .. } => *unit,
        }
    }
}

/// Half-duplex Modbus transport.
pub trait ModbusTransport {
    /// Link initialised and usable.
    fn is_up(&self) -> bool;

    /// Send `request` and wait for its reply.
    fn exchange(&mut self, request: &ModbusRequest) -> Result<ModbusReply, TransportError>;

    /// Queue `request`; its outcome is returned by a later `poll`.
    fn submit(&mut self, request: &ModbusRequest) -> Result<(), TransportError>;

    /// Next completed submitted request, if any.
    fn poll(&mut self) -> Option<Completion>;
}
