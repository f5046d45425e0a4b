//! Tool-driven spindle selection.
//!
//! When the binding table is in auto-select mode, every tool change picks
//! the highest selectable slot whose tool-start threshold the new tool
//! reaches. The notification is then forwarded to listeners registered
//! earlier, whatever the outcome.

use spindle_common::hooks::HookChain;
use spindle_common::spindle::registry::{SelectError, SpindleRegistry};
use spindle_common::spindle::types::{SpindleId, ToolId};
use tracing::{debug, info, warn};

use crate::binding::BindingTable;

/// Tool-changed notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolData {
    /// Newly loaded tool.
    pub tool_id: ToolId,
}

/// Tool-driven selection with a forwarding listener chain.
#[derive(Debug, Default)]
pub struct SelectionPolicy {
    forward: HookChain<ToolData>,
}

impl SelectionPolicy {
    /// Policy with no forward listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener called after the policy has handled a tool change.
    pub fn register_forward(&mut self, hook: impl FnMut(&ToolData) + Send + 'static) {
        self.forward.register(hook);
    }

    /// Handle a tool change.
    ///
    /// Returns the slot whose spindle was activated, `None` when auto-select
    /// is off or nothing matched. Activation failures are logged and the
    /// scan continues with the next lower slot.
    pub fn on_tool_changed(
        &mut self,
        tool: &ToolData,
        table: &BindingTable,
        registry: &mut dyn SpindleRegistry,
    ) -> Option<usize> {
        let selected = if table.is_auto_select() {
            self.select_for_tool(tool.tool_id, table, registry)
        } else {
            None
        };

        self.forward.notify(tool);
        selected
    }

    /// Activate a physical spindle. Failures are returned, not retried.
    pub fn activate(
        &self,
        id: SpindleId,
        registry: &mut dyn SpindleRegistry,
    ) -> Result<(), SelectError> {
        registry.select(id)
    }

    fn select_for_tool(
        &self,
        tool_id: ToolId,
        table: &BindingTable,
        registry: &mut dyn SpindleRegistry,
    ) -> Option<usize> {
        for slot in (0..table.selectable()).rev() {
            let Some(entry) = table.get(slot) else {
                continue;
            };
            let Some(bound_id) = entry.spindle_id else {
                continue;
            };
            if !(slot == 0 || entry.min_tool_id > 0) || tool_id < entry.min_tool_id {
                continue;
            }

            let id = if slot == 0 {
                table.default_spindle()
            } else {
                bound_id
            };

            match self.activate(id, registry) {
                Ok(()) => {
                    info!("Tool {} selected spindle {} (slot {})", tool_id, id, slot);
                    return Some(slot);
                }
                Err(e) => warn!("Tool {}: slot {} activation failed: {}", tool_id, slot, e),
            }
        }

        debug!("Tool {}: no slot matched", tool_id);
        None
    }
}
