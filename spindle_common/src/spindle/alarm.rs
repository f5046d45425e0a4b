//! Fatal spindle alarms.
//!
//! Alarms are not `Err` values: they are raised into the embedding motion
//! system, which must treat them as motion-halting. Nothing in this
//! workspace recovers from an alarm on its own.

use std::fmt;

use super::types::SpindleId;

/// Motion-halting spindle alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpindleAlarm {
    /// Drive did not answer correctly within the retry bound, or failed
    /// during cold start.
    DriveFault(SpindleId),
    /// Protocol exception that could not be attributed to any request.
    Spindle(SpindleId),
}

impl SpindleAlarm {
    /// Spindle that raised the alarm.
    pub const fn spindle(&self) -> SpindleId {
        match self {
            Self::DriveFault(id) | Self::Spindle(id) => *id,
        }
    }
}

impl fmt::Display for SpindleAlarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DriveFault(id) => write!(f, "VFD fault on spindle {id}"),
            Self::Spindle(id) => write!(f, "spindle alarm on spindle {id}"),
        }
    }
}

/// Receiver of spindle alarms.
pub trait AlarmSink {
    /// Raise an alarm.
    fn raise(&mut self, alarm: SpindleAlarm);
}

impl AlarmSink for Vec<SpindleAlarm> {
    fn raise(&mut self, alarm: SpindleAlarm) {
        self.push(alarm);
    }
}
