//! Error types for binding table configuration and persistence.

use thiserror::Error;

/// Binding store failures.
///
/// Read-side failures are recovered by restoring factory defaults; they
/// never surface as alarms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Nothing has been stored yet.
    #[error("No binding table stored")]
    Missing,

    /// Underlying storage failed.
    #[error("Binding store I/O error: {0}")]
    Io(String),

    /// Stored blob has the wrong size.
    #[error("Binding table length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Expected blob length.
        expected: usize,
        /// Length actually read.
        actual: usize,
    },

    /// Encoding the table failed.
    #[error("Failed to encode binding table: {0}")]
    Encode(String),

    /// Decoding the table failed.
    #[error("Failed to decode binding table: {0}")]
    Decode(String),
}

/// Rejected binding table writes. The table is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    /// Fewer than two physical spindles are registered.
    #[error("Setting disabled: fewer than two spindles registered")]
    Disabled,

    /// Slot or value outside the accepted range.
    #[error("Setting value out of range")]
    OutOfRange,

    /// Binding a slot to the default spindle.
    #[error("Spindle {0} is the default spindle")]
    InvalidStatement(u8),

    /// Slot 0 is always the default spindle.
    #[error("Slot 0 cannot be rebound")]
    ImmutableSlot,

    /// Physical spindle already bound to another slot.
    #[error("Spindle {spindle} already bound to slot {slot}")]
    DuplicateBinding {
        /// Spindle id requested.
        spindle: u8,
        /// Slot already holding it.
        slot: usize,
    },

    /// Table changed but could not be persisted.
    #[error("Failed to persist binding table: {0}")]
    Store(#[from] StoreError),
}
