//! Spindle configuration sections.
//!
//! - `SelectConfig` - `[select]`: binding table capacity, defaults, store
//! - `VfdConfig` - `[vfd]`: retry bound, poll interval, speed scaling
//! - `DriveConfig` - `[[drives]]`: one entry per physical drive, in
//!   registration order

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::consts::{
    DEFAULT_RPM_PER_HZ, DEFAULT_SELECTABLE_SLOTS, DEFAULT_STORE_FILE, MAX_SPINDLE_SLOTS,
    VFD_POLL_INTERVAL_MS, VFD_RETRIES,
};

use super::types::{SpindleId, SpindleKind, SpindleRef, ToolId};

fn default_selectable_slots() -> usize {
    DEFAULT_SELECTABLE_SLOTS
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_FILE)
}

fn default_retries() -> u16 {
    VFD_RETRIES
}

fn default_poll_interval_ms() -> u64 {
    VFD_POLL_INTERVAL_MS
}

fn default_rpm_per_hz() -> u32 {
    DEFAULT_RPM_PER_HZ
}

/// Binding table configuration (`[select]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectConfig {
    /// System default spindle, always bound to slot 0.
    #[serde(default)]
    pub default_spindle: SpindleId,

    /// Slots taking part in tool-driven selection and the settings surface.
    #[serde(default = "default_selectable_slots")]
    pub selectable_slots: usize,

    /// Factory reference ids for slots 1, 2, ... used by restore.
    #[serde(default)]
    pub slot_defaults: Vec<SpindleRef>,

    /// Size of the tool table; thresholds above it are clamped on load.
    #[serde(default)]
    pub max_tool_id: Option<ToolId>,

    /// Binding table store file.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            default_spindle: SpindleId::default(),
            selectable_slots: DEFAULT_SELECTABLE_SLOTS,
            slot_defaults: Vec::new(),
            max_tool_id: None,
            store_path: default_store_path(),
        }
    }
}

impl SelectConfig {
    /// Factory reference id for `slot` (slot 0 has none).
    pub fn slot_default(&self, slot: usize) -> SpindleRef {
        slot.checked_sub(1)
            .and_then(|i| self.slot_defaults.get(i).copied())
            .unwrap_or(SpindleRef::None)
    }

    /// Validate the section.
    ///
    /// # Validation Rules
    /// 1. `1 <= selectable_slots <= MAX_SPINDLE_SLOTS`
    /// 2. `slot_defaults` covers at most slots `1..MAX_SPINDLE_SLOTS`
    /// 3. `max_tool_id`, if set, is non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selectable_slots == 0 || self.selectable_slots > MAX_SPINDLE_SLOTS {
            return Err(ConfigError::ValidationError(format!(
                "selectable_slots must be in 1..={} (got {})",
                MAX_SPINDLE_SLOTS, self.selectable_slots
            )));
        }
        if self.slot_defaults.len() >= MAX_SPINDLE_SLOTS {
            return Err(ConfigError::ValidationError(format!(
                "slot_defaults has {} entries (max {})",
                self.slot_defaults.len(),
                MAX_SPINDLE_SLOTS - 1
            )));
        }
        if self.max_tool_id == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_tool_id must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// VFD transport and scaling configuration (`[vfd]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VfdConfig {
    /// Retry bound before a drive fault is raised.
    #[serde(default = "default_retries")]
    pub retries: u16,

    /// Minimum interval between speed read-back polls [ms].
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// RPM per Hz of drive output frequency.
    #[serde(default = "default_rpm_per_hz")]
    pub rpm_per_hz: u32,

    /// At-speed tolerance [%]; 0 disables at-speed evaluation.
    #[serde(default)]
    pub at_speed_tolerance: f32,
}

impl Default for VfdConfig {
    fn default() -> Self {
        Self {
            retries: VFD_RETRIES,
            poll_interval_ms: VFD_POLL_INTERVAL_MS,
            rpm_per_hz: DEFAULT_RPM_PER_HZ,
            at_speed_tolerance: 0.0,
        }
    }
}

impl VfdConfig {
    /// Validate the section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::ValidationError(
                "vfd.retries must be greater than 0".to_string(),
            ));
        }
        if self.rpm_per_hz == 0 {
            return Err(ConfigError::ValidationError(
                "vfd.rpm_per_hz must be greater than 0".to_string(),
            ));
        }
        if !self.at_speed_tolerance.is_finite() || self.at_speed_tolerance < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "vfd.at_speed_tolerance must be a non-negative percentage (got {})",
                self.at_speed_tolerance
            )));
        }
        Ok(())
    }
}

/// Register map of a supported VFD model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VfdProfile {
    /// Yalang YL620A.
    Yl620a,
    /// Durapulse GS20.
    Gs20,
}

/// One physical drive (`[[drives]]`), registered in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    /// Display name.
    pub name: String,

    /// Driver reference id.
    pub ref_id: SpindleRef,

    /// Drive class.
    pub kind: SpindleKind,

    /// Register map (VFD only).
    #[serde(default)]
    pub profile: Option<VfdProfile>,

    /// Modbus unit address (VFD only).
    #[serde(default)]
    pub modbus_address: Option<u8>,
}

impl DriveConfig {
    /// Validate one drive entry.
    ///
    /// VFD entries need a profile and a unit address in `1..=247`.
    pub fn validate(&self, idx: usize) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "drives[{idx}]: name cannot be empty"
            )));
        }
        if self.kind == SpindleKind::Vfd {
            if self.profile.is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "drives[{idx}] '{}': vfd drive needs a profile",
                    self.name
                )));
            }
            match self.modbus_address {
                Some(addr) if (1..=247).contains(&addr) => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "drives[{idx}] '{}': invalid modbus_address {:?}",
                        self.name, other
                    )));
                }
            }
        }
        Ok(())
    }
}
