//! Modbus request/reply model.
//!
//! Only the two function codes the drives need are modelled. Framing and
//! CRC belong to the transport; requests here carry the PDU fields plus
//! the context tag the reply or exception is matched against.

use heapless::Vec as HVec;
use static_assertions::const_assert;

/// Largest reply ADU handled (read of one register plus slack).
pub const MAX_REPLY_ADU: usize = 16;

/// Bit of the first reply byte flagging a drive-side error.
pub const REPLY_ERROR_BIT: u8 = 0x80;

const_assert!(MAX_REPLY_ADU >= 8);

/// Modbus function code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read N holding registers.
    ReadHoldingRegisters = 0x03,
    /// Write one holding register.
    WriteRegister = 0x06,
}

/// Logical operation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VfdContext {
    /// Run/stop and direction command.
    SetStatus = 1,
    /// Target speed write.
    SetRpm = 2,
    /// Output frequency read-back.
    GetRpm = 3,
    /// Maximum frequency read.
    GetMaxRpm = 4,
}

impl VfdContext {
    /// Wire tag.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Decode a tag, `None` for unknown values.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::SetStatus),
            2 => Some(Self::SetRpm),
            3 => Some(Self::GetRpm),
            4 => Some(Self::GetMaxRpm),
            _ => None,
        }
    }
}

/// One request to a drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModbusRequest {
    /// Unit (slave) address.
    pub unit: u8,
    /// Function code.
    pub function: FunctionCode,
    /// Register address.
    pub register: u16,
    /// Value to write, or number of registers to read.
    pub payload: u16,
    /// Frame length on the wire, CRC included.
    pub tx_length: u8,
    /// Expected reply frame length, CRC included.
    pub rx_length: u8,
    /// Operation the request belongs to.
    pub context: VfdContext,
}

impl ModbusRequest {
    /// Write `value` to `register`.
    pub const fn write_register(unit: u8, register: u16, value: u16, context: VfdContext) -> Self {
        Self {
            unit,
            function: FunctionCode::WriteRegister,
            register,
            payload: value,
            tx_length: 8,
            rx_length: 8,
            context,
        }
    }

    /// Read one holding register.
    pub const fn read_register(unit: u8, register: u16, context: VfdContext) -> Self {
        Self {
            unit,
            function: FunctionCode::ReadHoldingRegisters,
            register,
            payload: 1,
            tx_length: 8,
            rx_length: 7,
            context,
        }
    }

    /// ADU without CRC.
    pub const fn adu(&self) -> [u8; 6] {
        let reg = self.register.to_be_bytes();
        let payload = self.payload.to_be_bytes();
        [
            self.unit,
            self.function as u8,
            reg[0],
            reg[1],
            payload[0],
            payload[1],
        ]
    }
}

/// Reply frame delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusReply {
    /// Reply ADU, CRC stripped.
    pub adu: HVec<u8, MAX_REPLY_ADU>,
    /// Context tag of the request it answers.
    pub context: u8,
}

impl ModbusReply {
    /// Reply from raw bytes; excess bytes are dropped.
    pub fn from_adu(bytes: &[u8], context: u8) -> Self {
        let mut adu = HVec::new();
        for &b in bytes.iter().take(MAX_REPLY_ADU) {
            let _ = adu.push(b);
        }
        Self { adu, context }
    }

    /// Echo reply to a register write.
    pub fn write_echo(request: &ModbusRequest) -> Self {
        Self::from_adu(&request.adu(), request.context.tag())
    }

    /// Reply to a single register read.
    pub fn read_response(request: &ModbusRequest, value: u16) -> Self {
        let [hi, lo] = value.to_be_bytes();
        Self::from_adu(
            &[request.unit, FunctionCode::ReadHoldingRegisters as u8, 2, hi, lo],
            request.context.tag(),
        )
    }

    /// Drive-side error flagged in the status byte.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.adu.first().is_some_and(|b| b & REPLY_ERROR_BIT != 0)
    }

    /// Unit address the reply came from.
    #[inline]
    pub fn unit(&self) -> Option<u8> {
        self.adu.first().map(|b| b & !REPLY_ERROR_BIT)
    }

    /// First register value of a read reply.
    pub fn register_value(&self) -> Option<u16> {
        match self.adu.get(3..5) {
            Some(&[hi, lo]) => Some(u16::from_be_bytes([hi, lo])),
            _ => None,
        }
    }
}
