//! Snapshot cache contract for the registry's entity sets.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::snapshot::{ExperimentSnapshot, FeatureSnapshot};

/// Namespace holding the active sets.
pub const ACTIVE_NAMESPACE: &str = "active";
/// Namespace holding the inactive sets.
pub const INACTIVE_NAMESPACE: &str = "inactive";

/// Restored contents of one namespace. A slot is `None` when nothing could be
/// restored for it.
pub type Restored = (Option<Vec<ExperimentSnapshot>>, Option<Vec<FeatureSnapshot>>);

/// Best-effort persistence of experiment and feature snapshots.
///
/// Implementations never fail: write errors are logged and dropped, and a
/// missing or unreadable cache restores as `None`.
pub trait SnapshotCache: Send + Sync {
    fn cache(
        &self,
        experiments: &[ExperimentSnapshot],
        features: &[FeatureSnapshot],
        namespace: Option<&str>,
    );

    fn restore(&self, namespace: Option<&str>) -> Restored;

    fn clear(&self, namespace: Option<&str>);
}

/// Cache kept in memory, for tests and sessions without a data directory.
#[derive(Debug, Default)]
pub struct MemorySnapshotCache {
    slots: Mutex<HashMap<String, (Vec<ExperimentSnapshot>, Vec<FeatureSnapshot>)>>,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: Option<&str>) -> String {
        namespace.unwrap_or_default().to_string()
    }
}

impl SnapshotCache for MemorySnapshotCache {
    fn cache(
        &self,
        experiments: &[ExperimentSnapshot],
        features: &[FeatureSnapshot],
        namespace: Option<&str>,
    ) {
        self.slots.lock().insert(
            Self::key(namespace),
            (experiments.to_vec(), features.to_vec()),
        );
    }

    fn restore(&self, namespace: Option<&str>) -> Restored {
        match self.slots.lock().get(&Self::key(namespace)) {
            Some((experiments, features)) => (Some(experiments.clone()), Some(features.clone())),
            None => (None, None),
        }
    }

    fn clear(&self, namespace: Option<&str>) {
        self.slots.lock().remove(&Self::key(namespace));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_independent() {
        let cache = MemorySnapshotCache::new();
        let feature = FeatureSnapshot {
            name: "f".to_string(),
            values: None,
        };
        cache.cache(&[], &[feature.clone()], Some(ACTIVE_NAMESPACE));

        let (experiments, features) = cache.restore(Some(ACTIVE_NAMESPACE));
        assert_eq!(experiments, Some(Vec::new()));
        assert_eq!(features, Some(vec![feature]));
        assert_eq!(cache.restore(Some(INACTIVE_NAMESPACE)), (None, None));

        cache.clear(Some(ACTIVE_NAMESPACE));
        assert_eq!(cache.restore(Some(ACTIVE_NAMESPACE)), (None, None));
    }
}
