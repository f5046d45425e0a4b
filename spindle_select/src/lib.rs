//! # Spindle Select Library
//!
//! Binds logical spindle slots to physical spindle drives and decides which
//! drive is active, either from an explicit spindle select command or from
//! the tool that was just loaded.
//!
//! ## Components
//!
//! 1. **BindingTable** - fixed-capacity slot → spindle table with
//!    load/save/restore and duplicate compaction
//! 2. **SelectionPolicy** - tool-driven selection (highest matching slot wins)
//! 3. **CommandGateway** - validation/execution of the spindle select M-code
//! 4. **Settings** - per-slot enable and tool-start settings
//!
//! ## Startup
//!
//! Loading the table only marks the activation pass as pending. The owner
//! runs [`BindingTable::activate_spindles`] once every physical drive has
//! registered.

pub mod binding;
pub mod error;
pub mod gateway;
pub mod policy;
pub mod settings;
pub mod store;

pub use crate::binding::{BindingEntry, BindingTable, LoadSource};
pub use crate::error::{SettingError, StoreError};
pub use crate::gateway::{CommandGateway, GatewayStatus, McodeHandler, McodeKind, ParserBlock, Words};
pub use crate::policy::{SelectionPolicy, ToolData};
pub use crate::settings::{SettingDetail, SettingFormat, SettingId};
pub use crate::store::{BindingStore, FileStore, MemoryStore};
