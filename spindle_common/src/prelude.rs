//! Prelude module for common re-exports.
//!
//! ```rust
//! use spindle_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::spindle::config::{DriveConfig, SelectConfig, VfdConfig, VfdProfile};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{MAX_SPINDLE_SLOTS, RPM_UNKNOWN, SPINDLE_SELECT_MCODE, VFD_RETRIES};

// ─── Spindle Types ──────────────────────────────────────────────────
pub use crate::spindle::alarm::{AlarmSink, SpindleAlarm};
pub use crate::spindle::registry::{SelectError, SpindleRegistry};
pub use crate::spindle::types::{
    SpindleCaps, SpindleId, SpindleInfo, SpindleKind, SpindleRef, SpindleRuntimeData, ToolId,
    VfdState,
};

// ─── Hooks ──────────────────────────────────────────────────────────
pub use crate::hooks::HookChain;
