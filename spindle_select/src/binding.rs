//! Spindle binding table.
//!
//! Maps logical slots to physical spindle ids plus a minimum tool number.
//!
//! ## Invariants
//!
//! - Slot 0 is always bound to the configured default spindle with a
//!   tool-start threshold of 0. Its stored value is never trusted.
//! - After `load()` no two slots bind the same physical spindle; the lowest
//!   slot keeps it and bound slots are compacted toward the front.
//! - Auto-select mode is derived: it is on iff a selectable slot beyond 0
//!   is bound with a threshold > 0.
//!
//! ## Startup
//!
//! `load()` does not touch the drives. It leaves the activation pass
//! pending; the owner calls `activate_spindles()` once all drives have
//! registered.

use spindle_common::consts::MAX_SPINDLE_SLOTS;
use spindle_common::spindle::config::SelectConfig;
use spindle_common::spindle::registry::SpindleRegistry;
use spindle_common::spindle::types::{SpindleId, SpindleRef, ToolId};
use spindle_common::consts::DEFAULT_MAX_TOOL_ID;
use tracing::{debug, info, warn};

use crate::error::{SettingError, StoreError};
use crate::store::{self, BindingStore};

/// One slot of the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingEntry {
    /// Bound physical spindle, `None` when unbound.
    pub spindle_id: Option<SpindleId>,
    /// Lowest tool number that selects this slot.
    pub min_tool_id: ToolId,
}

impl BindingEntry {
    /// Unbound slot.
    pub const UNBOUND: Self = Self {
        spindle_id: None,
        min_tool_id: 0,
    };

    /// Slot bound to `id`.
    #[inline]
    pub const fn bound(id: SpindleId, min_tool_id: ToolId) -> Self {
        Self {
            spindle_id: Some(id),
            min_tool_id,
        }
    }

    /// Whether a physical spindle is bound.
    #[inline]
    pub const fn is_bound(&self) -> bool {
        self.spindle_id.is_some()
    }
}

/// Where the table contents came from on the last load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Decoded from the store.
    Stored,
    /// Store unreadable; factory defaults restored.
    Defaults,
}

/// Fixed-capacity slot → spindle binding table.
#[derive(Debug, Clone)]
pub struct BindingTable {
    entries: [BindingEntry; MAX_SPINDLE_SLOTS],
    config: SelectConfig,
    auto_select: bool,
    activation_pending: bool,
}

impl BindingTable {
    /// Create a table with only slot 0 bound.
    ///
    /// `config` is expected to be validated.
    pub fn new(config: SelectConfig) -> Self {
        let mut entries = [BindingEntry::UNBOUND; MAX_SPINDLE_SLOTS];
        entries[0] = BindingEntry::bound(config.default_spindle, 0);
        Self {
            entries,
            config,
            auto_select: false,
            activation_pending: false,
        }
    }

    /// Number of stored slots.
    #[inline]
    pub const fn capacity(&self) -> usize {
        MAX_SPINDLE_SLOTS
    }

    /// Number of slots taking part in selection.
    #[inline]
    pub fn selectable(&self) -> usize {
        self.config.selectable_slots.clamp(1, MAX_SPINDLE_SLOTS)
    }

    /// The system default spindle (slot 0).
    #[inline]
    pub fn default_spindle(&self) -> SpindleId {
        self.config.default_spindle
    }

    /// Highest accepted tool-start threshold.
    #[inline]
    pub fn max_tool_id(&self) -> ToolId {
        self.config.max_tool_id.unwrap_or(DEFAULT_MAX_TOOL_ID)
    }

    /// All slots.
    #[inline]
    pub fn entries(&self) -> &[BindingEntry; MAX_SPINDLE_SLOTS] {
        &self.entries
    }

    /// Entry for `slot`, `None` if out of range.
    #[inline]
    pub fn get(&self, slot: usize) -> Option<BindingEntry> {
        self.entries.get(slot).copied()
    }

    /// Whether `slot` is in range and bound.
    #[inline]
    pub fn is_bound(&self, slot: usize) -> bool {
        self.get(slot).is_some_and(|e| e.is_bound())
    }

    /// Physical spindle selected by `slot`.
    pub fn resolve(&self, slot: usize) -> Option<SpindleId> {
        if slot == 0 {
            Some(self.default_spindle())
        } else {
            self.get(slot).and_then(|e| e.spindle_id)
        }
    }

    /// Tool-driven auto-selection active.
    #[inline]
    pub fn is_auto_select(&self) -> bool {
        self.auto_select
    }

    /// Activation pass scheduled by `load()` and not yet run.
    #[inline]
    pub fn activation_pending(&self) -> bool {
        self.activation_pending
    }

    /// Slot holding `spindle_id`: 0 for the default spindle, otherwise the
    /// highest slot bound to it.
    pub fn binding_of(&self, spindle_id: SpindleId) -> Option<usize> {
        if spindle_id == self.default_spindle() {
            return Some(0);
        }
        (0..MAX_SPINDLE_SLOTS)
            .rev()
            .find(|&slot| self.entries[slot].spindle_id == Some(spindle_id))
    }

    /// Bind `slot` to `spindle_id`, or unbind it with `None`.
    ///
    /// The table is left unchanged on error. The caller persists.
    pub fn set(
        &mut self,
        slot: usize,
        spindle_id: Option<SpindleId>,
        registry: &dyn SpindleRegistry,
    ) -> Result<(), SettingError> {
        if slot == 0 {
            return Err(SettingError::ImmutableSlot);
        }
        if slot >= MAX_SPINDLE_SLOTS {
            return Err(SettingError::OutOfRange);
        }

        if let Some(id) = spindle_id {
            let count = registry.count();
            if count < 2 {
                return Err(SettingError::Disabled);
            }
            if id.index() >= count {
                return Err(SettingError::OutOfRange);
            }
            if id == self.default_spindle() {
                return Err(SettingError::InvalidStatement(id.0));
            }
            if let Some(other) = (1..MAX_SPINDLE_SLOTS)
                .find(|&s| s != slot && self.entries[s].spindle_id == Some(id))
            {
                return Err(SettingError::DuplicateBinding {
                    spindle: id.0,
                    slot: other,
                });
            }
        }

        self.entries[slot].spindle_id = spindle_id;
        self.recompute_auto_select();
        debug!("Slot {} bound to {:?}", slot, spindle_id);
        Ok(())
    }

    /// Set the tool-start threshold of `slot`.
    ///
    /// Slot 0 accepts only 0.
    pub fn set_min_tool_id(&mut self, slot: usize, tool_id: ToolId) -> Result<(), SettingError> {
        if slot >= self.selectable() || tool_id > self.max_tool_id() {
            return Err(SettingError::OutOfRange);
        }
        if slot == 0 && tool_id != 0 {
            return Err(SettingError::ImmutableSlot);
        }
        self.entries[slot].min_tool_id = tool_id;
        self.recompute_auto_select();
        Ok(())
    }

    /// Restore factory defaults and persist them.
    ///
    /// Slot 0 gets the default spindle; every other slot with a configured
    /// reference id is bound to the first registered spindle carrying it.
    /// All thresholds reset to 0.
    pub fn restore_defaults(
        &mut self,
        registry: &dyn SpindleRegistry,
        store: &mut dyn BindingStore,
    ) -> Result<(), StoreError> {
        self.entries[0] = BindingEntry::bound(self.default_spindle(), 0);

        for slot in 1..MAX_SPINDLE_SLOTS {
            let ref_id = self.config.slot_default(slot);
            let spindle_id = if ref_id == SpindleRef::None {
                None
            } else {
                registry
                    .spindles()
                    .iter()
                    .find(|info| info.ref_id == ref_id)
                    .map(|info| info.id)
            };
            self.entries[slot] = BindingEntry {
                spindle_id,
                min_tool_id: 0,
            };
        }

        info!("Binding table restored to defaults");
        self.save(store)
    }

    /// Load the table from `store`, falling back to defaults.
    ///
    /// Slot 0 is forced to the default spindle, duplicates are removed and
    /// bound slots compacted, thresholds clamped to the tool table size.
    /// The activation pass is left pending.
    pub fn load(
        &mut self,
        registry: &dyn SpindleRegistry,
        store: &mut dyn BindingStore,
    ) -> LoadSource {
        let source = match store.read().and_then(|blob| store::decode_table(&blob)) {
            Ok(entries) => {
                self.entries = entries;
                LoadSource::Stored
            }
            Err(e) => {
                warn!("Binding table unavailable ({e}), restoring defaults");
                if let Err(e) = self.restore_defaults(registry, store) {
                    warn!("Failed to persist default binding table: {e}");
                }
                LoadSource::Defaults
            }
        };

        self.entries[0] = BindingEntry::bound(self.default_spindle(), 0);
        self.compact();
        self.recompute_auto_select();

        if let Some(max_tool) = self.config.max_tool_id {
            for entry in &mut self.entries {
                entry.min_tool_id = entry.min_tool_id.min(max_tool);
            }
        }

        self.activation_pending = true;

        info!(
            "Binding table loaded ({:?}): {} bound slots, auto-select {}",
            source,
            self.entries.iter().filter(|e| e.is_bound()).count(),
            if self.auto_select { "on" } else { "off" }
        );
        source
    }

    /// Persist the table.
    pub fn save(&mut self, store: &mut dyn BindingStore) -> Result<(), StoreError> {
        self.recompute_auto_select();
        let blob = store::encode_table(&self.entries)?;
        store.write(&blob)
    }

    /// Activation pass, run once after all drives registered.
    ///
    /// Clears bindings to ids the registry does not know (all non-default
    /// bindings when fewer than two spindles exist) and enables every
    /// remaining bound drive. Returns the number of drives enabled.
    pub fn activate_spindles(&mut self, registry: &mut dyn SpindleRegistry) -> usize {
        let count = registry.count();
        let mut enabled = 0;

        for slot in 1..MAX_SPINDLE_SLOTS {
            let Some(id) = self.entries[slot].spindle_id else {
                continue;
            };

            if count < 2 || id.index() >= count {
                warn!(
                    "Slot {} bound to spindle {} but {} spindle(s) registered, clearing",
                    slot, id, count
                );
                self.entries[slot].spindle_id = None;
                continue;
            }

            match registry.enable(id) {
                Ok(()) => enabled += 1,
                Err(e) => warn!("Failed to enable spindle {} for slot {}: {}", id, slot, e),
            }
        }

        self.activation_pending = false;
        self.recompute_auto_select();
        info!("Spindle activation pass complete: {} enabled", enabled);
        enabled
    }

    /// Remove duplicate physical ids and compact bound slots toward the
    /// front, keeping order of first appearance.
    ///
    /// `j` tracks the first slot that may receive a later binding.
    fn compact(&mut self) {
        let e = &mut self.entries;
        let mut j = 1;

        for idx in 2..MAX_SPINDLE_SLOTS {
            for k in 0..idx {
                if k < j && e[j].spindle_id == e[k].spindle_id {
                    e[j].spindle_id = None;
                }
                if e[idx].spindle_id == e[k].spindle_id {
                    e[idx].spindle_id = None;
                }
            }
            if !e[j].is_bound() && e[idx].is_bound() {
                e[j] = e[idx];
                e[idx] = BindingEntry::UNBOUND;
            }
            if !e[idx].is_bound() && e[j].is_bound() {
                j = idx;
            }
        }
    }

    fn recompute_auto_select(&mut self) {
        self.auto_select = (1..self.selectable()).rev().any(|slot| {
            let entry = self.entries[slot];
            entry.is_bound() && entry.min_tool_id > 0
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, encode_table};
    use spindle_common::spindle::registry::SelectError;
    use spindle_common::spindle::types::{SpindleCaps, SpindleInfo, SpindleKind};

    struct FakeRegistry {
        spindles: Vec<SpindleInfo>,
        enabled: Vec<SpindleId>,
        active: Option<SpindleId>,
    }

    impl FakeRegistry {
        fn with(refs: &[SpindleRef]) -> Self {
            let spindles = refs
                .iter()
                .enumerate()
                .map(|(i, r)| SpindleInfo {
                    id: SpindleId(i as u8),
                    ref_id: *r,
                    name: format!("spindle-{i}"),
                    kind: SpindleKind::Basic,
                    caps: SpindleCaps::empty(),
                })
                .collect();
            Self {
                spindles,
                enabled: Vec::new(),
                active: None,
            }
        }
    }

    impl SpindleRegistry for FakeRegistry {
        fn spindles(&self) -> &[SpindleInfo] {
            &self.spindles
        }

        fn select(&mut self, id: SpindleId) -> Result<(), SelectError> {
            self.active = Some(id);
            Ok(())
        }

        fn enable(&mut self, id: SpindleId) -> Result<(), SelectError> {
            self.enabled.push(id);
            Ok(())
        }

        fn active(&self) -> Option<SpindleId> {
            self.active
        }
    }

    fn four_spindles() -> FakeRegistry {
        FakeRegistry::with(&[
            SpindleRef::Pwm,
            SpindleRef::Yl620a,
            SpindleRef::Gs20,
            SpindleRef::OnOff,
        ])
    }

    fn table() -> BindingTable {
        BindingTable::new(SelectConfig::default())
    }

    fn stored(ids: &[Option<u8>]) -> MemoryStore {
        let mut entries = [BindingEntry::UNBOUND; MAX_SPINDLE_SLOTS];
        for (slot, id) in ids.iter().enumerate() {
            entries[slot].spindle_id = id.map(SpindleId);
        }
        MemoryStore::with_blob(encode_table(&entries).unwrap())
    }

    fn ids(table: &BindingTable) -> Vec<Option<u8>> {
        table
            .entries()
            .iter()
            .map(|e| e.spindle_id.map(|id| id.0))
            .collect()
    }

    #[test]
    fn new_table_binds_only_slot_zero() {
        let t = table();
        assert_eq!(t.resolve(0), Some(SpindleId(0)));
        assert!((1..MAX_SPINDLE_SLOTS).all(|s| !t.is_bound(s)));
        assert!(!t.is_auto_select());
    }

    #[test]
    fn load_missing_store_restores_defaults_and_persists() {
        let reg = four_spindles();
        let mut t = BindingTable::new(SelectConfig {
            slot_defaults: vec![SpindleRef::Gs20, SpindleRef::Stepper],
            ..SelectConfig::default()
        });
        let mut store = MemoryStore::new();

        assert_eq!(t.load(&reg, &mut store), LoadSource::Defaults);
        assert_eq!(t.resolve(1), Some(SpindleId(2)));
        // Stepper not registered → unbound.
        assert!(!t.is_bound(2));
        assert_eq!(store.writes(), 1);
        assert!(t.activation_pending());
    }

    #[test]
    fn restore_defaults_resets_thresholds_and_stale_bindings() {
        let registry = four_spindles();
        let mut t = BindingTable::new(SelectConfig {
            slot_defaults: vec![SpindleRef::Yl620a, SpindleRef::Gs20],
            ..SelectConfig::default()
        });
        t.set(1, Some(SpindleId(3)), &registry).unwrap();
        t.set(2, Some(SpindleId(2)), &registry).unwrap();
        t.set(4, Some(SpindleId(1)), &registry).unwrap();
        t.set_min_tool_id(1, 5).unwrap();
        t.set_min_tool_id(2, 7).unwrap();
        assert!(t.is_auto_select());

        let mut store = MemoryStore::new();
        t.restore_defaults(&registry, &mut store).unwrap();

        let mut expected = vec![None; MAX_SPINDLE_SLOTS];
        expected[..3].copy_from_slice(&[Some(0), Some(1), Some(2)]);
        assert_eq!(ids(&t), expected);
        assert!(t.entries().iter().all(|e| e.min_tool_id == 0));
        assert!(!t.is_auto_select());
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn load_never_trusts_stored_slot_zero() {
        let reg = four_spindles();
        let mut t = BindingTable::new(SelectConfig {
            default_spindle: SpindleId(1),
            ..SelectConfig::default()
        });
        let mut store = stored(&[Some(3), Some(2)]);

        assert_eq!(t.load(&reg, &mut store), LoadSource::Stored);
        assert_eq!(t.get(0), Some(BindingEntry::bound(SpindleId(1), 0)));
    }

    #[test]
    fn load_compacts_duplicates_keeping_first_appearance() {
        let reg = four_spindles();
        let mut t = table();
        let mut store = stored(&[Some(0), Some(1), Some(1), None, Some(2), Some(1), Some(3)]);

        t.load(&reg, &mut store);
        assert_eq!(
            ids(&t),
            vec![Some(0), Some(1), Some(2), Some(3), None, None, None, None]
        );
    }

    #[test]
    fn load_compaction_leaves_gap_behind_moved_slot() {
        let reg = four_spindles();
        let mut t = table();
        let mut store = stored(&[Some(0), None, None, Some(1), Some(2)]);

        t.load(&reg, &mut store);
        assert_eq!(ids(&t)[..5], [Some(0), Some(1), None, Some(2), None]);
    }

    #[test]
    fn load_drops_slot_bound_to_default_spindle() {
        let reg = four_spindles();
        let mut t = table();
        let mut store = stored(&[Some(0), Some(0), Some(2)]);

        t.load(&reg, &mut store);
        assert_eq!(ids(&t)[..3], [Some(0), Some(2), None]);
    }

    #[test]
    fn load_clamps_thresholds_to_tool_table() {
        let reg = four_spindles();
        let mut entries = [BindingEntry::UNBOUND; MAX_SPINDLE_SLOTS];
        entries[1] = BindingEntry::bound(SpindleId(1), 500);
        let mut store = MemoryStore::with_blob(encode_table(&entries).unwrap());
        let mut t = BindingTable::new(SelectConfig {
            max_tool_id: Some(100),
            ..SelectConfig::default()
        });

        t.load(&reg, &mut store);
        assert_eq!(t.get(1).unwrap().min_tool_id, 100);
        assert!(t.is_auto_select());
    }

    #[test]
    fn set_rejects_invalid_bindings() {
        let reg = four_spindles();
        let mut t = table();

        assert_eq!(t.set(0, Some(SpindleId(1)), &reg), Err(SettingError::ImmutableSlot));
        assert_eq!(t.set(1, Some(SpindleId(9)), &reg), Err(SettingError::OutOfRange));
        assert_eq!(
            t.set(1, Some(SpindleId(0)), &reg),
            Err(SettingError::InvalidStatement(0))
        );

        t.set(1, Some(SpindleId(2)), &reg).unwrap();
        assert_eq!(
            t.set(2, Some(SpindleId(2)), &reg),
            Err(SettingError::DuplicateBinding { spindle: 2, slot: 1 })
        );
        assert_eq!(t.resolve(2), None);

        // Rebinding the same slot to its own id is fine.
        assert!(t.set(1, Some(SpindleId(2)), &reg).is_ok());
    }

    #[test]
    fn set_disabled_with_single_spindle() {
        let reg = FakeRegistry::with(&[SpindleRef::Pwm]);
        let mut t = table();
        assert_eq!(t.set(1, Some(SpindleId(0)), &reg), Err(SettingError::Disabled));
        // Unbinding is always allowed.
        assert!(t.set(1, None, &reg).is_ok());
    }

    #[test]
    fn auto_select_follows_thresholds() {
        let reg = four_spindles();
        let mut t = table();
        t.set(1, Some(SpindleId(1)), &reg).unwrap();
        assert!(!t.is_auto_select());

        t.set_min_tool_id(1, 5).unwrap();
        assert!(t.is_auto_select());

        t.set(1, None, &reg).unwrap();
        assert!(!t.is_auto_select());
    }

    #[test]
    fn slot_zero_threshold_pinned() {
        let mut t = table();
        assert_eq!(t.set_min_tool_id(0, 3), Err(SettingError::ImmutableSlot));
        assert!(t.set_min_tool_id(0, 0).is_ok());
        assert_eq!(t.set_min_tool_id(7, 1), Err(SettingError::OutOfRange));
    }

    #[test]
    fn activation_clears_unknown_and_enables_bound() {
        let mut reg = FakeRegistry::with(&[SpindleRef::Pwm, SpindleRef::Yl620a, SpindleRef::Gs20]);
        let mut t = table();
        let mut store = stored(&[None, Some(2), Some(5), Some(1)]);

        t.load(&reg, &mut store);
        assert_eq!(t.activate_spindles(&mut reg), 2);
        assert_eq!(reg.enabled, vec![SpindleId(2), SpindleId(1)]);
        assert!(!t.activation_pending());
        assert!((3..MAX_SPINDLE_SLOTS).all(|s| !t.is_bound(s)));
    }

    #[test]
    fn activation_with_single_spindle_unbinds_everything_else() {
        let mut reg = FakeRegistry::with(&[SpindleRef::Pwm]);
        let mut t = table();
        let mut store = stored(&[Some(0), Some(1), Some(2)]);

        t.load(&reg, &mut store);
        assert_eq!(t.activate_spindles(&mut reg), 0);
        assert!(reg.enabled.is_empty());
        assert!((1..MAX_SPINDLE_SLOTS).all(|s| !t.is_bound(s)));
        assert_eq!(t.resolve(0), Some(SpindleId(0)));
    }

    #[test]
    fn binding_of_prefers_default_then_highest_slot() {
        let reg = four_spindles();
        let mut t = table();
        t.set(2, Some(SpindleId(3)), &reg).unwrap();

        assert_eq!(t.binding_of(SpindleId(0)), Some(0));
        assert_eq!(t.binding_of(SpindleId(3)), Some(2));
        assert_eq!(t.binding_of(SpindleId(1)), None);
    }
}
