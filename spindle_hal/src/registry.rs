//! Registry of physical spindle drives.
//!
//! Drives are registered once at startup, in configuration order, and get
//! ids `0, 1, ...`. The registry is constructed by the core and lent to the
//! selection code through [`SpindleRegistry`]; there is no global state.
//!
//! Selections are recorded so the core can notify the drive controllers
//! after the selecting call returns.

use spindle_common::spindle::config::DriveConfig;
use spindle_common::spindle::registry::{SelectError, SpindleRegistry};
use spindle_common::spindle::types::{SpindleCaps, SpindleId, SpindleInfo, SpindleKind, SpindleRef};
use tracing::{debug, info};

use crate::config::MAX_DRIVES;
use crate::error::HalError;

/// Registered drives and the active selection.
#[derive(Debug, Default)]
pub struct DriveRegistry {
    spindles: Vec<SpindleInfo>,
    enabled: Vec<bool>,
    active: Option<SpindleId>,
    selections: Vec<SpindleId>,
}

impl DriveRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a drive and return its id.
    ///
    /// # Errors
    /// Returns `HalError::ConfigError` when the registry is full.
    pub fn register(&mut self, drive: &DriveConfig) -> Result<SpindleId, HalError> {
        if self.spindles.len() >= MAX_DRIVES {
            return Err(HalError::ConfigError(format!(
                "Cannot register '{}': {} drives already registered",
                drive.name, MAX_DRIVES
            )));
        }

        let id = SpindleId(self.spindles.len() as u8);
        let caps = match drive.kind {
            SpindleKind::Vfd => SpindleCaps::VFD,
            SpindleKind::Basic => basic_caps(drive.ref_id),
        };
        self.spindles.push(SpindleInfo {
            id,
            ref_id: drive.ref_id,
            name: drive.name.clone(),
            kind: drive.kind,
            caps,
        });
        self.enabled.push(false);

        info!("Registered spindle {}: {} ({:?})", id, drive.name, drive.kind);
        Ok(id)
    }

    /// Whether `id` has been enabled.
    pub fn is_enabled(&self, id: SpindleId) -> bool {
        self.enabled.get(id.index()).copied().unwrap_or(false)
    }

    /// Selections made since the last call, oldest first.
    pub fn take_selections(&mut self) -> Vec<SpindleId> {
        std::mem::take(&mut self.selections)
    }
}

impl SpindleRegistry for DriveRegistry {
    fn spindles(&self) -> &[SpindleInfo] {
        &self.spindles
    }

    fn select(&mut self, id: SpindleId) -> Result<(), SelectError> {
        if id.index() >= self.spindles.len() {
            return Err(SelectError::UnknownSpindle(id));
        }
        if let Some(enabled) = self.enabled.get_mut(id.index()) {
            *enabled = true;
        }
        if self.active != Some(id) {
            debug!("Spindle {} selected (was {:?})", id, self.active);
        }
        self.active = Some(id);
        self.selections.push(id);
        Ok(())
    }

    fn enable(&mut self, id: SpindleId) -> Result<(), SelectError> {
        match self.enabled.get_mut(id.index()) {
            Some(enabled) => {
                *enabled = true;
                Ok(())
            }
            None => Err(SelectError::UnknownSpindle(id)),
        }
    }

    fn active(&self) -> Option<SpindleId> {
        self.active
    }
}

fn basic_caps(ref_id: SpindleRef) -> SpindleCaps {
    match ref_id {
        SpindleRef::OnOffDir => SpindleCaps::DIRECTION,
        SpindleRef::Pwm | SpindleRef::Stepper => SpindleCaps::VARIABLE | SpindleCaps::DIRECTION,
        _ => SpindleCaps::empty(),
    }
}
