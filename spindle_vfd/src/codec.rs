//! Register value encoding.
//!
//! Command register layout:
//!
//! | Bits | Field     | Values                                   |
//! |------|-----------|------------------------------------------|
//! | 1:0  | run mode  | 00 no-op, 01 stop, 10 run, 11 jog        |
//! | 5:4  | direction | 00 none, 01 forward, 10 reverse, 11 toggle |
//!
//! Speeds are written in the drive's native unit, a fraction of a Hz.

const RUN_MODE_MASK: u16 = 0x0003;
const DIRECTION_SHIFT: u16 = 4;
const DIRECTION_MASK: u16 = 0x0030;

/// Run mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    NoOp,
    Stop,
    Run,
    Jog,
}

impl RunMode {
    const fn bits(self) -> u16 {
        match self {
            Self::NoOp => 0b00,
            Self::Stop => 0b01,
            Self::Run => 0b10,
            Self::Jog => 0b11,
        }
    }

    const fn from_bits(bits: u16) -> Self {
        match bits & RUN_MODE_MASK {
            0b01 => Self::Stop,
            0b10 => Self::Run,
            0b11 => Self::Jog,
            _ => Self::NoOp,
        }
    }
}

/// Direction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    None,
    Forward,
    Reverse,
    Toggle,
}

impl Direction {
    const fn bits(self) -> u16 {
        match self {
            Self::None => 0b00,
            Self::Forward => 0b01,
            Self::Reverse => 0b10,
            Self::Toggle => 0b11,
        }
    }

    const fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0b01 => Self::Forward,
            0b10 => Self::Reverse,
            0b11 => Self::Toggle,
            _ => Self::None,
        }
    }
}

/// Decoded command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandWord {
    pub mode: RunMode,
    pub direction: Direction,
}

impl CommandWord {
    /// Command for a spindle state change.
    ///
    /// Stops when off or at zero speed, otherwise runs.
    pub fn for_state(on: bool, ccw: bool, rpm: f32) -> Self {
        Self {
            mode: if !on || rpm == 0.0 {
                RunMode::Stop
            } else {
                RunMode::Run
            },
            direction: if ccw {
                Direction::Reverse
            } else {
                Direction::Forward
            },
        }
    }

    /// Register value.
    pub const fn encode(self) -> u16 {
        self.mode.bits() | (self.direction.bits() << DIRECTION_SHIFT)
    }

    /// Decode a register value; reserved bits are ignored.
    pub const fn decode(raw: u16) -> Self {
        Self {
            mode: RunMode::from_bits(raw),
            direction: Direction::from_bits((raw & DIRECTION_MASK) >> DIRECTION_SHIFT),
        }
    }
}

/// Encode `rpm` into native speed units.
///
/// `native = (rpm * units_per_hz) / rpm_per_hz`, truncating. Negative
/// speeds encode as 0, overflow saturates.
pub fn encode_speed(rpm: f32, rpm_per_hz: u32, units_per_hz: u32) -> u16 {
    if rpm_per_hz == 0 {
        return 0;
    }
    let rpm = if rpm.is_finite() && rpm > 0.0 { rpm as u32 } else { 0 };
    let native = u64::from(rpm) * u64::from(units_per_hz) / u64::from(rpm_per_hz);
    u16::try_from(native).unwrap_or(u16::MAX)
}

/// Decode a native speed value into RPM.
pub fn decode_speed(raw: u16, rpm_per_hz: u32, units_per_hz: u32) -> f32 {
    if units_per_hz == 0 {
        return 0.0;
    }
    f32::from(raw) * rpm_per_hz as f32 / units_per_hz as f32
}
