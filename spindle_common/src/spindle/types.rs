//! Spindle identifiers, capability flags and runtime state.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consts::{RPM_UNKNOWN, UNBOUND_SPINDLE_ID};

/// Physical spindle id, assigned by the registry in registration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SpindleId(pub u8);

impl SpindleId {
    /// Index into registry enumeration.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Decode a persisted id; negative values mean "unbound".
    #[inline]
    pub const fn from_persisted(raw: i8) -> Option<Self> {
        if raw < 0 { None } else { Some(Self(raw as u8)) }
    }

    /// Encode an optional id for persistence.
    #[inline]
    pub const fn to_persisted(id: Option<Self>) -> i8 {
        match id {
            Some(id) => id.0 as i8,
            None => UNBOUND_SPINDLE_ID,
        }
    }
}

impl fmt::Display for SpindleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tool number as reported by the tool-change notifier.
pub type ToolId = u32;

/// Compile-time reference id of a spindle driver.
///
/// Used to resolve factory slot defaults against whatever the registry
/// actually enumerated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpindleRef {
    /// No driver.
    #[default]
    None,
    /// On/off spindle without direction output.
    OnOff,
    /// On/off spindle with direction output.
    OnOffDir,
    /// PWM-controlled spindle.
    Pwm,
    /// Stepper-driven spindle.
    Stepper,
    /// Yalang YL620A VFD.
    Yl620a,
    /// Durapulse GS20 VFD.
    Gs20,
}

bitflags! {
    /// Capabilities advertised by a registered spindle driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpindleCaps: u8 {
        /// Variable speed.
        const VARIABLE       = 0x01;
        /// Reports at-speed.
        const AT_SPEED       = 0x02;
        /// Supports direction.
        const DIRECTION      = 0x04;
        /// Commanded over a bus rather than by I/O pins.
        const CMD_CONTROLLED = 0x08;
    }
}

impl SpindleCaps {
    /// Capabilities of a Modbus VFD.
    pub const VFD: Self = Self::from_bits_truncate(
        Self::VARIABLE.bits()
            | Self::AT_SPEED.bits()
            | Self::DIRECTION.bits()
            | Self::CMD_CONTROLLED.bits(),
    );
}

/// Class of physical spindle drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpindleKind {
    /// Pin-driven spindle (on/off, optional direction).
    Basic,
    /// Variable-frequency drive on a Modbus link.
    Vfd,
}

/// Descriptor of a registered physical spindle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpindleInfo {
    /// Registry-assigned id.
    pub id: SpindleId,
    /// Driver reference id.
    pub ref_id: SpindleRef,
    /// Human-readable name.
    pub name: String,
    /// Drive class.
    pub kind: SpindleKind,
    /// Advertised capabilities.
    pub caps: SpindleCaps,
}

/// Last commanded/observed run state of a drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VfdState {
    /// Spindle running.
    pub on: bool,
    /// Spinning counter-clockwise.
    pub ccw: bool,
    /// Output speed within tolerance of the programmed speed.
    pub at_speed: bool,
}

/// Per-drive runtime data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpindleRuntimeData {
    /// Last programmed speed, `RPM_UNKNOWN` when invalid.
    pub rpm_programmed: f32,
    /// Last speed read back from the drive.
    pub rpm_actual: f32,
    /// Lower bound of the at-speed window.
    pub rpm_low_limit: f32,
    /// Upper bound of the at-speed window.
    pub rpm_high_limit: f32,
    /// Maximum speed reported by the drive, if read.
    pub rpm_max: Option<f32>,
    /// Programmed run state.
    pub state_programmed: VfdState,
    /// At-speed evaluation enabled (tolerance > 0).
    pub at_speed_enabled: bool,
}

impl Default for SpindleRuntimeData {
    fn default() -> Self {
        Self {
            rpm_programmed: RPM_UNKNOWN,
            rpm_actual: 0.0,
            rpm_low_limit: 0.0,
            rpm_high_limit: 0.0,
            rpm_max: None,
            state_programmed: VfdState::default(),
            at_speed_enabled: false,
        }
    }
}

impl SpindleRuntimeData {
    /// Program a new target speed and recompute the at-speed window.
    ///
    /// `tolerance` is in percent; zero or negative disables the check.
    pub fn set_at_speed_range(&mut self, rpm: f32, tolerance: f32) {
        self.rpm_programmed = rpm;
        self.state_programmed.at_speed = false;
        self.at_speed_enabled = tolerance > 0.0;
        if self.at_speed_enabled {
            self.rpm_low_limit = rpm * (1.0 - tolerance / 100.0);
            self.rpm_high_limit = rpm * (1.0 + tolerance / 100.0);
        }
    }

    /// Record a speed read-back and evaluate at-speed.
    pub fn validate_at_speed(&mut self, rpm_actual: f32) -> bool {
        self.rpm_actual = rpm_actual;
        self.state_programmed.at_speed = !self.at_speed_enabled
            || (rpm_actual >= self.rpm_low_limit && rpm_actual <= self.rpm_high_limit);
        self.state_programmed.at_speed
    }

    /// Clear run state and invalidate the programmed speed.
    pub fn reset(&mut self) {
        let at_speed_enabled = self.at_speed_enabled;
        *self = Self {
            at_speed_enabled,
            ..Self::default()
        };
    }
}
