//! Binding table persistence.
//!
//! The table is stored as an opaque fixed-size blob: `MAX_SPINDLE_SLOTS`
//! records of `{ spindle_id: i8, min_tool_id: u32 }` encoded with bincode
//! (fixed-width little-endian integers, no length prefix). There is no
//! version field; a blob of the wrong length is treated as corrupt.

use serde::{Deserialize, Serialize};
use spindle_common::consts::MAX_SPINDLE_SLOTS;
use spindle_common::spindle::types::{SpindleId, ToolId};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::binding::BindingEntry;
use crate::error::StoreError;

/// Encoded size of one record.
pub const BINDING_RECORD_LEN: usize = 5;

/// Encoded size of the whole table.
pub const BINDING_BLOB_LEN: usize = BINDING_RECORD_LEN * MAX_SPINDLE_SLOTS;

/// On-storage layout of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedBinding {
    spindle_id: i8,
    min_tool_id: ToolId,
}

/// Encode the table into its storage blob.
pub fn encode_table(entries: &[BindingEntry; MAX_SPINDLE_SLOTS]) -> Result<Vec<u8>, StoreError> {
    let records: [PersistedBinding; MAX_SPINDLE_SLOTS] = (*entries).map(|e| PersistedBinding {
        spindle_id: SpindleId::to_persisted(e.spindle_id),
        min_tool_id: e.min_tool_id,
    });
    let blob = bincode::serialize(&records).map_err(|e| StoreError::Encode(e.to_string()))?;
    if blob.len() != BINDING_BLOB_LEN {
        return Err(StoreError::LengthMismatch {
            expected: BINDING_BLOB_LEN,
            actual: blob.len(),
        });
    }
    Ok(blob)
}

/// Decode a storage blob. Length mismatch is an error.
pub fn decode_table(blob: &[u8]) -> Result<[BindingEntry; MAX_SPINDLE_SLOTS], StoreError> {
    if blob.len() != BINDING_BLOB_LEN {
        return Err(StoreError::LengthMismatch {
            expected: BINDING_BLOB_LEN,
            actual: blob.len(),
        });
    }
    let records: [PersistedBinding; MAX_SPINDLE_SLOTS] =
        bincode::deserialize(blob).map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(records.map(|r| BindingEntry {
        spindle_id: SpindleId::from_persisted(r.spindle_id),
        min_tool_id: r.min_tool_id,
    }))
}

/// Non-volatile storage for the binding table blob.
pub trait BindingStore {
    /// Read the stored blob.
    fn read(&mut self) -> Result<Vec<u8>, StoreError>;

    /// Replace the stored blob.
    fn write(&mut self, blob: &[u8]) -> Result<(), StoreError>;
}

/// File-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store at `path`. Nothing is touched until the first write.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BindingStore for FileStore {
    fn read(&mut self) -> Result<Vec<u8>, StoreError> {
        debug!("Reading binding table from {:?}", self.path);

        if !self.path.exists() {
            return Err(StoreError::Missing);
        }
        fs::read(&self.path).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn write(&mut self, blob: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Io(format!("Failed to create directory: {e}")))?;
            }
        }

        let file = File::create(&self.path)
            .map_err(|e| StoreError::Io(format!("Failed to create store file: {e}")))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(blob)
            .and_then(|_| writer.flush())
            .map_err(|e| StoreError::Io(e.to_string()))?;

        info!("Saved binding table ({} bytes) to {:?}", blob.len(), self.path);
        Ok(())
    }
}

/// In-memory store, used by tests and by builds without a store file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<Vec<u8>>,
    writes: usize,
}

impl MemoryStore {
    /// Empty store; the first read fails with `StoreError::Missing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with a raw blob.
    pub fn with_blob(blob: Vec<u8>) -> Self {
        Self {
            blob: Some(blob),
            writes: 0,
        }
    }

    /// Current blob.
    pub fn blob(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }

    /// Number of writes performed.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl BindingStore for MemoryStore {
    fn read(&mut self) -> Result<Vec<u8>, StoreError> {
        self.blob.clone().ok_or(StoreError::Missing)
    }

    fn write(&mut self, blob: &[u8]) -> Result<(), StoreError> {
        self.blob = Some(blob.to_vec());
        self.writes += 1;
        Ok(())
    }
}
