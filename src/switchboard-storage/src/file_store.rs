//! State store persisted as a flat JSON object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use switchboard_core::StateStore;
use switchboard_core::store::DEFAULT_NAMESPACE;

use crate::error::Result;
use crate::medium::write_atomic;

/// [`StateStore`] writing every change through to a JSON file.
///
/// Writes are best effort: a failed write is logged and the in-memory value
/// is kept.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    namespace: String,
    values: Mutex<BTreeMap<String, bool>>,
}

impl JsonFileStore {
    /// Open the store at `path` with the default namespace.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_namespace(path, DEFAULT_NAMESPACE)
    }

    /// Open the store, loading existing values. An unreadable file starts
    /// empty.
    pub fn with_namespace(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        let path = path.into();
        let values = match load(&path) {
            Ok(values) => values,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring unreadable state file");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), keys = values.len(), "Opened state store");
        Self {
            path,
            namespace: namespace.into(),
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, bool>) {
        let result = serde_json::to_vec_pretty(values)
            .map_err(Into::into)
            .and_then(|bytes| write_atomic(&self.path, &bytes));
        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "Failed to persist state");
        }
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, bool>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(err.into()),
    }
}

impl StateStore for JsonFileStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn save(&self, value: Option<bool>, entity: &str, key: &str) {
        let key = self.namespaced_key(entity, key);
        let mut values = self.values.lock();
        match value {
            Some(value) => values.insert(key, value),
            None => values.remove(&key),
        };
        self.persist(&values);
    }

    fn read(&self, entity: &str, key: &str) -> bool {
        let key = self.namespaced_key(entity, key);
        self.values.lock().get(&key).copied().unwrap_or(false)
    }
}
