//! Spindle registry interface.
//!
//! The registry owns the physical drive descriptors. Selection code only
//! queries it and asks it to activate or enable a drive by id; it never
//! mutates the descriptors.

use thiserror::Error;

use super::types::{SpindleId, SpindleInfo};

/// Errors reported when activating or enabling a spindle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    /// No spindle registered under this id.
    #[error("Unknown spindle id {0}")]
    UnknownSpindle(SpindleId),

    /// The drive refused activation.
    #[error("Spindle {id} rejected activation: {reason}")]
    Rejected {
        /// Spindle that refused.
        id: SpindleId,
        /// Driver-provided reason.
        reason: String,
    },
}

/// Enumeration and activation of physical spindle drives.
pub trait SpindleRegistry {
    /// Registered spindles in id order.
    fn spindles(&self) -> &[SpindleInfo];

    /// Make `id` the active spindle.
    fn select(&mut self, id: SpindleId) -> Result<(), SelectError>;

    /// Enable `id` without selecting it (multi-spindle builds).
    fn enable(&mut self, id: SpindleId) -> Result<(), SelectError>;

    /// Currently active spindle, if any.
    fn active(&self) -> Option<SpindleId>;

    /// Number of registered spindles.
    fn count(&self) -> usize {
        self.spindles().len()
    }

    /// Descriptor for `id`.
    fn info(&self, id: SpindleId) -> Option<&SpindleInfo> {
        self.spindles().get(id.index())
    }
}
