//! Platform-aware locations for Switchboard's caches and state.
//!
//! The root defaults to the platform cache directory:
//!
//! - **Linux**: `~/.cache/switchboard/`
//! - **macOS**: `~/Library/Caches/switchboard/`
//! - **Windows**: `%LOCALAPPDATA%\switchboard\`
//!
//! `SWITCHBOARD_CACHE_DIR` overrides it.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, StorageError};

/// Directory name under the platform cache directory.
pub const APP_NAME: &str = "switchboard";

/// Environment variable overriding the root directory.
pub const CACHE_DIR_ENV: &str = "SWITCHBOARD_CACHE_DIR";

/// Subdirectory holding the debug snapshot cache.
pub const DEBUG_DIR: &str = "debug";
/// Subdirectory holding the prefill history.
pub const PREFILL_DIR: &str = "prefill";
/// File backing the durable state store.
pub const STATE_FILE: &str = "state.json";
/// File holding the per-install identifier.
pub const INSTALL_ID_FILE: &str = "install_id";

/// Switchboard storage paths container.
#[derive(Debug, Clone)]
pub struct SwitchboardPaths {
    /// Root directory.
    pub root: PathBuf,
    pub debug_dir: PathBuf,
    pub prefill_dir: PathBuf,
    pub state_file: PathBuf,
    pub install_id_file: PathBuf,
}

impl SwitchboardPaths {
    /// Create paths under the platform cache directory.
    pub fn new() -> Result<Self> {
        Ok(Self::from_root(switchboard_cache_dir()?))
    }

    /// Create paths from a custom root directory.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            debug_dir: root.join(DEBUG_DIR),
            prefill_dir: root.join(PREFILL_DIR),
            state_file: root.join(STATE_FILE),
            install_id_file: root.join(INSTALL_ID_FILE),
            root,
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.debug_dir)?;
        std::fs::create_dir_all(&self.prefill_dir)?;
        debug!(root = %self.root.display(), "Switchboard storage directories initialized");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Root directory for Switchboard storage.
pub fn switchboard_cache_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var(CACHE_DIR_ENV) {
        if !val.is_empty() {
            let path = PathBuf::from(val);
            debug!(path = %path.display(), "Using SWITCHBOARD_CACHE_DIR override");
            return Ok(path);
        }
    }

    let base = dirs::cache_dir().ok_or(StorageError::CacheDirNotFound)?;
    Ok(base.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_structure() {
        let paths = SwitchboardPaths::from_root("/tmp/sb");
        assert!(paths.debug_dir.ends_with(DEBUG_DIR));
        assert!(paths.prefill_dir.ends_with(PREFILL_DIR));
        assert_eq!(paths.state_file, PathBuf::from("/tmp/sb").join(STATE_FILE));
        assert_eq!(paths.root(), Path::new("/tmp/sb"));
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SwitchboardPaths::from_root(dir.path().join("nested"));
        paths.ensure_dirs().unwrap();
        assert!(paths.debug_dir.is_dir());
        assert!(paths.prefill_dir.is_dir());
    }
}
