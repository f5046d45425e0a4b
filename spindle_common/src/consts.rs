//! System-wide constants for the spindle workspace.
//!
//! Single source of truth for all numeric limits and default paths.
//! Imported by all crates; do not duplicate them elsewhere.

use static_assertions::const_assert;

/// Number of binding records stored in the persisted table.
pub const MAX_SPINDLE_SLOTS: usize = 8;

/// Default number of slots taking part in selection.
pub const DEFAULT_SELECTABLE_SLOTS: usize = 4;

/// Persisted sentinel for an unbound slot.
pub const UNBOUND_SPINDLE_ID: i8 = -1;

/// M-code handled by the spindle select gateway.
pub const SPINDLE_SELECT_MCODE: u16 = 104;

/// Highest tool number accepted for a tool-start threshold when no tool
/// table size is configured.
pub const DEFAULT_MAX_TOOL_ID: u32 = 65535;

/// Transport retries before a VFD is declared failed.
pub const VFD_RETRIES: u16 = 10;

/// Minimum interval between two speed read-back polls, in milliseconds.
pub const VFD_POLL_INTERVAL_MS: u64 = 100;

/// Default RPM per Hz of drive output frequency (2-pole motor at 60 Hz base).
pub const DEFAULT_RPM_PER_HZ: u32 = 60;

/// RPM sentinel meaning "not programmed / unknown".
pub const RPM_UNKNOWN: f32 = -1.0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/spindle/spindle.toml";

/// Default binding table store file name.
pub const DEFAULT_STORE_FILE: &str = "spindle_bindings.bin";

// Slot 0 plus at least one selectable slot; serde array support ends at 32.
const_assert!(MAX_SPINDLE_SLOTS >= 2 && MAX_SPINDLE_SLOTS <= 32);
const_assert!(DEFAULT_SELECTABLE_SLOTS <= MAX_SPINDLE_SLOTS);
// Physical ids are persisted as i8.
const_assert!(MAX_SPINDLE_SLOTS <= i8::MAX as usize);
