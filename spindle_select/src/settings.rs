//! Per-slot spindle settings.
//!
//! Two settings per slot:
//!
//! - `SpindleEnable(slot)` binds a physical spindle to slot 1.. (radio
//!   buttons over the registry names plus "Disabled")
//! - `ToolStart(slot)` sets the tool-start threshold
//!
//! Writes are applied to the table and persisted immediately.

use heapless::Vec as HVec;
use spindle_common::consts::MAX_SPINDLE_SLOTS;
use spindle_common::spindle::registry::SpindleRegistry;
use spindle_common::spindle::types::{SpindleId, ToolId};
use tracing::info;

use crate::binding::BindingTable;
use crate::error::SettingError;
use crate::store::BindingStore;

/// Setting identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingId {
    /// Physical spindle bound to a slot.
    SpindleEnable(usize),
    /// Tool-start threshold of a slot.
    ToolStart(usize),
}

impl SettingId {
    /// Slot the setting belongs to.
    pub fn slot(self) -> usize {
        match self {
            Self::SpindleEnable(slot) | Self::ToolStart(slot) => slot,
        }
    }
}

/// Value format of a setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingFormat {
    /// One choice per entry; the value is the entry index.
    RadioButtons(Vec<String>),
    /// Integer in `min..=max`.
    Int {
        /// Lowest value.
        min: u32,
        /// Highest value.
        max: u32,
    },
}

/// Setting description for the settings surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingDetail {
    /// Setting id.
    pub id: SettingId,
    /// Group label.
    pub label: String,
    /// Value format.
    pub format: SettingFormat,
}

/// Describe `id`, `None` when the setting does not exist.
pub fn details(
    id: SettingId,
    table: &BindingTable,
    registry: &dyn SpindleRegistry,
) -> Option<SettingDetail> {
    let slot = id.slot();
    let format = match id {
        SettingId::SpindleEnable(slot) if (1..table.selectable()).contains(&slot) => {
            let mut choices: Vec<String> =
                registry.spindles().iter().map(|s| s.name.clone()).collect();
            choices.push("Disabled".to_string());
            SettingFormat::RadioButtons(choices)
        }
        SettingId::ToolStart(slot) if slot < table.selectable() => SettingFormat::Int {
            min: 0,
            max: if slot == 0 { 0 } else { table.max_tool_id() },
        },
        _ => return None,
    };

    Some(SettingDetail {
        id,
        label: format!("Spindle {slot}"),
        format,
    })
}

/// Whether `id` is currently shown.
pub fn is_available(id: SettingId, table: &BindingTable, registry: &dyn SpindleRegistry) -> bool {
    match id {
        SettingId::SpindleEnable(slot) => {
            (1..table.selectable()).contains(&slot) && slot < registry.count()
        }
        SettingId::ToolStart(slot) => {
            slot < table.selectable() && (slot == 0 || table.is_bound(slot))
        }
    }
}

/// Current value of `id`.
///
/// `SpindleEnable` reads the bound id, or the registry count for
/// "Disabled".
pub fn get(id: SettingId, table: &BindingTable, registry: &dyn SpindleRegistry) -> Option<u32> {
    let entry = table.get(id.slot())?;
    Some(match id {
        SettingId::SpindleEnable(_) => entry
            .spindle_id
            .map_or(registry.count() as u32, |sid| u32::from(sid.0)),
        SettingId::ToolStart(_) => entry.min_tool_id,
    })
}

/// Write `value` to `id` and persist the table.
pub fn set(
    id: SettingId,
    value: u32,
    table: &mut BindingTable,
    registry: &dyn SpindleRegistry,
    store: &mut dyn BindingStore,
) -> Result<(), SettingError> {
    match id {
        SettingId::SpindleEnable(slot) => {
            if slot >= table.selectable() {
                return Err(SettingError::OutOfRange);
            }
            let spindle_id = if value as usize >= registry.count() {
                None
            } else {
                u8::try_from(value).ok().map(SpindleId)
            };
            table.set(slot, spindle_id, registry)?;
        }
        SettingId::ToolStart(slot) => table.set_min_tool_id(slot, value as ToolId)?,
    }

    table.save(store)?;
    info!("Setting {:?} = {}", id, value);
    Ok(())
}

/// Settings to list: slot 0 plus every selectable bound slot.
pub fn iterate(table: &BindingTable) -> HVec<SettingId, { 2 * MAX_SPINDLE_SLOTS }> {
    let mut ids = HVec::new();
    for slot in 0..table.selectable() {
        if slot > 0 {
            let _ = ids.push(SettingId::SpindleEnable(slot));
        }
        if slot == 0 || table.is_bound(slot) {
            let _ = ids.push(SettingId::ToolStart(slot));
        }
    }
    ids
}
