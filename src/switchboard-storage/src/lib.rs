//! Switchboard Storage - file-backed persistence for the switchboard.
//!
//! Everything lives under one cache root:
//!
//! - **Linux**: `~/.cache/switchboard/`
//! - **macOS**: `~/Library/Caches/switchboard/`
//! - **Windows**: `%LOCALAPPDATA%\switchboard\`
//!
//! The root can be overridden with `SWITCHBOARD_CACHE_DIR`.
//!
//! # Layout
//!
//! - `state.json` - durable experiment state ([`JsonFileStore`])
//! - `install_id` - per-install identifier
//! - `debug/{active,inactive}/` - debug override snapshots ([`EntityCache`])
//! - `prefill/` - history of previously seen entities ([`PrefillController`])
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use switchboard_core::{EntityContext, Switchboard, restore_debug_cache};
//! use switchboard_storage::{EntityCache, JsonFileStore, PrefillController, SwitchboardPaths};
//!
//! fn main() -> switchboard_storage::Result<()> {
//!     let paths = SwitchboardPaths::new()?;
//!     paths.ensure_dirs()?;
//!
//!     let store = Arc::new(JsonFileStore::open(&paths.state_file));
//!     let prefill = Arc::new(PrefillController::new(EntityCache::prefill(&paths)));
//!     let context = EntityContext::new(store).with_history(prefill);
//!
//!     let mut switchboard = Switchboard::new(context);
//!     restore_debug_cache(&mut switchboard, &EntityCache::debug(&paths));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod file_store;
pub mod install;
pub mod medium;
pub mod paths;
pub mod prefill;

// Re-export main types at crate root
pub use cache::{CACHE_VERSION, EntityCache};
pub use error::{Result, StorageError};
pub use file_store::JsonFileStore;
pub use install::load_or_create_install_id;
pub use medium::{CacheMedium, FileMedium};
pub use paths::{SwitchboardPaths, switchboard_cache_dir};
pub use prefill::PrefillController;
