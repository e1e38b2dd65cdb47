//! Namespaced boolean state store.
//!
//! Experiments persist their `isStarted` / `isCompleted` flags through the
//! [`StateStore`] capability only, so the backing medium can be swapped.
//! Keys take the form `<namespace>.<entity>.<key>`.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Default namespace for all keys.
pub const DEFAULT_NAMESPACE: &str = "switchboard.exp";

/// Durable boolean store keyed by `(entity, key)`.
pub trait StateStore: Send + Sync {
    /// Namespace prepended to every key.
    fn namespace(&self) -> &str;

    /// Store a value; `None` removes the key.
    fn save(&self, value: Option<bool>, entity: &str, key: &str);

    /// Read a value. Missing keys read as `false`.
    fn read(&self, entity: &str, key: &str) -> bool;

    /// Build the namespaced key for an entity.
    fn namespaced_key(&self, entity: &str, key: &str) -> String {
        format!("{}.{}.{}", self.namespace(), entity, key)
    }
}

/// In-memory store, useful for tests and ephemeral sessions.
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    values: Mutex<HashMap<String, bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn save(&self, value: Option<bool>, entity: &str, key: &str) {
        let key = self.namespaced_key(entity, key);
        let mut values = self.values.lock();
        match value {
            Some(value) => {
                values.insert(key, value);
            }
            None => {
                values.remove(&key);
            }
        }
    }

    fn read(&self, entity: &str, key: &str) -> bool {
        let key = self.namespaced_key(entity, key);
        self.values.lock().get(&key).copied().unwrap_or(false)
    }
}
