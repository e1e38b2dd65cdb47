//! Runtime assembled for one CLI invocation.
//!
//! Resolves the config file and data directory, opens the durable stores and
//! restores debug overrides left by earlier runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use switchboard_core::{
    CohortCatalog, DebugController, EntityContext, Switchboard, SwitchboardConfig, TracingAnalytics,
    restore_debug_cache,
};
use switchboard_storage::{
    EntityCache, FileMedium, JsonFileStore, PrefillController, SwitchboardPaths,
    load_or_create_install_id,
};

/// Config file name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "switchboard.toml";

pub type FileCache = EntityCache<FileMedium>;

/// Everything a command needs, wired together.
pub struct Session {
    pub paths: SwitchboardPaths,
    pub catalog: CohortCatalog,
    pub prefill: Arc<PrefillController<FileCache>>,
    pub debug_cache: FileCache,
    pub switchboard: Switchboard,
}

impl Session {
    /// Open the session. `config_path` and `data_dir` come from the command
    /// line; either falls back to platform defaults.
    pub fn open(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;

        let paths = match data_dir.map(Path::to_path_buf).or(config.data_dir.clone()) {
            Some(root) => SwitchboardPaths::from_root(root),
            None => SwitchboardPaths::new().context("Could not locate a cache directory")?,
        };
        paths
            .ensure_dirs()
            .with_context(|| format!("Could not create {}", paths.root().display()))?;
        debug!(root = %paths.root().display(), "Opened switchboard storage");

        let store = Arc::new(JsonFileStore::with_namespace(
            &paths.state_file,
            config.store_namespace.clone(),
        ));
        let prefill = Arc::new(PrefillController::new(EntityCache::prefill(&paths)));
        let catalog = config.cohort_catalog();
        prefill.populate_experiments_if_needed(&catalog);

        let context = EntityContext::new(store)
            .with_analytics(Arc::new(TracingAnalytics))
            .with_history(prefill.clone())
            .with_dangerous_call_logging(config.log_dangerous_calls);

        let mut switchboard = Switchboard::new(context);
        let debug_cache = EntityCache::debug(&paths);
        if restore_debug_cache(&mut switchboard, &debug_cache) {
            debug!("Restored debug overrides");
        }

        Ok(Self {
            paths,
            catalog,
            prefill,
            debug_cache,
            switchboard,
        })
    }

    pub fn controller(&mut self) -> DebugController<'_> {
        DebugController::new(&mut self.switchboard, &self.debug_cache)
    }

    pub fn install_id(&self) -> Result<String> {
        load_or_create_install_id(&self.paths.install_id_file).context("Could not read install id")
    }
}

/// Explicit path first, then `<config dir>/switchboard/switchboard.toml`. A
/// missing file means defaults.
fn load_config(explicit: Option<&Path>) -> Result<SwitchboardConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };
    match path {
        Some(path) if path.exists() => SwitchboardConfig::load(&path)
            .with_context(|| format!("Could not load config from {}", path.display())),
        _ => Ok(SwitchboardConfig::default()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("switchboard").join(CONFIG_FILE_NAME))
}
