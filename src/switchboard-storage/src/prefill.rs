//! Prefill history: every experiment and feature seen so far, kept so debug
//! tooling can offer to re-create them.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use switchboard_core::keys;
use switchboard_core::{
    CohortCatalog, EntityHistory, ExperimentSnapshot, FeatureSnapshot, SnapshotCache, Values,
};

#[derive(Debug, Default)]
struct History {
    experiments: BTreeMap<String, ExperimentSnapshot>,
    features: BTreeMap<String, FeatureSnapshot>,
}

/// History of previously seen entities, persisted after every change.
///
/// Install it on the [`EntityContext`](switchboard_core::EntityContext) so
/// the factory and registry record into it.
#[derive(Debug)]
pub struct PrefillController<C> {
    cache: C,
    history: Mutex<History>,
}

impl<C: SnapshotCache> PrefillController<C> {
    /// Create the controller and restore what the cache holds.
    pub fn new(cache: C) -> Self {
        let (experiments, features) = cache.restore(None);
        let history = History {
            experiments: experiments
                .unwrap_or_default()
                .into_iter()
                .map(|e| (e.name.clone(), e))
                .collect(),
            features: features
                .unwrap_or_default()
                .into_iter()
                .map(|f| (f.name.clone(), f))
                .collect(),
        };
        debug!(
            experiments = history.experiments.len(),
            features = history.features.len(),
            "Restored prefill history"
        );
        Self {
            cache,
            history: Mutex::new(history),
        }
    }

    fn cache_all(&self, history: &History) {
        let experiments: Vec<_> = history.experiments.values().cloned().collect();
        let features: Vec<_> = history.features.values().cloned().collect();
        self.cache.cache(&experiments, &features, None);
    }

    fn mutate(&self, change: impl FnOnce(&mut History)) {
        let mut history = self.history.lock();
        change(&mut history);
        self.cache_all(&history);
    }

    pub fn add_experiments(&self, experiments: &[ExperimentSnapshot]) {
        self.mutate(|history| {
            for experiment in experiments {
                history
                    .experiments
                    .insert(experiment.name.clone(), experiment.clone());
            }
        });
    }

    pub fn add_features(&self, features: &[FeatureSnapshot]) {
        self.mutate(|history| {
            for feature in features {
                history.features.insert(feature.name.clone(), feature.clone());
            }
        });
    }

    pub fn delete_experiment(&self, name: &str) -> bool {
        let mut removed = false;
        self.mutate(|history| removed = history.experiments.remove(name).is_some());
        removed
    }

    pub fn delete_feature(&self, name: &str) -> bool {
        let mut removed = false;
        self.mutate(|history| removed = history.features.remove(name).is_some());
        removed
    }

    pub fn clear_experiments(&self) {
        self.mutate(|history| history.experiments.clear());
    }

    pub fn clear_features(&self) {
        self.mutate(|history| history.features.clear());
    }

    /// Forget everything and drop the cache files.
    pub fn clear_cache(&self) {
        let mut history = self.history.lock();
        history.experiments.clear();
        history.features.clear();
        self.cache.clear(None);
    }

    pub fn experiment(&self, name: &str) -> Option<ExperimentSnapshot> {
        self.history.lock().experiments.get(name).cloned()
    }

    pub fn feature(&self, name: &str) -> Option<FeatureSnapshot> {
        self.history.lock().features.get(name).cloned()
    }

    /// Recorded experiments whose names are not in `existing`, by name.
    pub fn experiments_unique<'a>(
        &self,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Vec<ExperimentSnapshot> {
        let mut unique = self.history.lock().experiments.clone();
        for name in existing {
            unique.remove(name);
        }
        unique.into_values().collect()
    }

    /// Recorded features whose names are not in `existing`, by name.
    pub fn features_unique<'a>(
        &self,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Vec<FeatureSnapshot> {
        let mut unique = self.history.lock().features.clone();
        for name in existing {
            unique.remove(name);
        }
        unique.into_values().collect()
    }

    pub fn can_prefill_experiments<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> bool {
        !self.experiments_unique(existing).is_empty()
    }

    pub fn can_prefill_features<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> bool {
        !self.features_unique(existing).is_empty()
    }

    /// Record one experiment per catalog entry, assigned to the entry's
    /// default cohort.
    pub fn populate_experiments_if_needed(&self, catalog: &CohortCatalog) {
        let experiments: Vec<_> = catalog
            .iter()
            .map(|(name, cohorts)| {
                let mut values = Values::new();
                values.insert(
                    keys::COHORT.to_string(),
                    Value::String(catalog.default_cohort(name).to_string()),
                );
                ExperimentSnapshot {
                    name: name.to_string(),
                    values,
                    available_cohorts: cohorts.to_vec(),
                }
            })
            .collect();
        if !experiments.is_empty() {
            self.add_experiments(&experiments);
        }
    }
}

impl<C: SnapshotCache> EntityHistory for PrefillController<C> {
    fn record_experiments(&self, experiments: &[ExperimentSnapshot]) {
        self.add_experiments(experiments);
    }

    fn record_features(&self, features: &[FeatureSnapshot]) {
        self.add_features(features);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntityCache;
    use crate::paths::SwitchboardPaths;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchboard_core::cache::Restored;
    use switchboard_core::{EntityContext, MemorySnapshotCache, Switchboard};

    fn feature(name: &str) -> FeatureSnapshot {
        FeatureSnapshot {
            name: name.to_string(),
            values: None,
        }
    }

    #[test]
    fn test_unique_excludes_existing_and_sorts() {
        let prefill = PrefillController::new(MemorySnapshotCache::new());
        prefill.add_features(&[feature("zeta"), feature("alpha"), feature("mid")]);

        let unique = prefill.features_unique(["mid"]);
        let names: Vec<_> = unique.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        assert!(prefill.can_prefill_features(["alpha"]));
        assert!(!prefill.can_prefill_features(["alpha", "mid", "zeta"]));
    }

    #[test]
    fn test_history_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SwitchboardPaths::from_root(dir.path());

        let prefill = PrefillController::new(EntityCache::prefill(&paths));
        prefill.add_features(&[feature("f")]);
        prefill.delete_feature("missing");

        let reopened = PrefillController::new(EntityCache::prefill(&paths));
        assert!(reopened.feature("f").is_some());

        reopened.clear_cache();
        let again = PrefillController::new(EntityCache::prefill(&paths));
        assert!(again.feature("f").is_none());
    }

    #[test]
    fn test_records_from_configuration() {
        let prefill = Arc::new(PrefillController::new(MemorySnapshotCache::new()));
        let context = EntityContext::default().with_history(prefill.clone());
        let mut switchboard = Switchboard::new(context);
        switchboard.load_configuration(&json!({
            "exp": {"values": {"cohort": "A"}, "isActive": true},
            "old_feature": {"values": {}, "isActive": false},
        }));

        assert_eq!(prefill.experiment("exp").unwrap().values["cohort"], "A");
        assert!(prefill.feature("old_feature").is_some());

        switchboard.load_configuration(&json!({}));
        assert!(prefill.can_prefill_experiments(switchboard.experiments().names()));
    }

    /// Memory cache that counts writes.
    struct CountingCache {
        inner: MemorySnapshotCache,
        writes: Arc<AtomicUsize>,
    }

    impl SnapshotCache for CountingCache {
        fn cache(
            &self,
            experiments: &[ExperimentSnapshot],
            features: &[FeatureSnapshot],
            namespace: Option<&str>,
        ) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.cache(experiments, features, namespace);
        }

        fn restore(&self, namespace: Option<&str>) -> Restored {
            self.inner.restore(namespace)
        }

        fn clear(&self, namespace: Option<&str>) {
            self.inner.clear(namespace);
        }
    }

    #[test]
    fn test_large_configuration_written_once_per_set() {
        let writes = Arc::new(AtomicUsize::new(0));
        let prefill = Arc::new(PrefillController::new(CountingCache {
            inner: MemorySnapshotCache::new(),
            writes: writes.clone(),
        }));
        let context = EntityContext::default().with_history(prefill.clone());
        let mut switchboard = Switchboard::new(context);

        let mut entries = serde_json::Map::new();
        for i in 0..500 {
            entries.insert(format!("flag{i}"), json!({"values": null, "isActive": true}));
        }
        entries.insert(
            "exp".to_string(),
            json!({"values": {"cohort": "A"}, "isActive": false}),
        );
        switchboard.load_configuration(&Value::Object(entries));

        assert_eq!(switchboard.features().len(), 500);
        assert_eq!(writes.load(Ordering::SeqCst), 2);
        assert_eq!(prefill.features_unique([]).len(), 500);
        assert!(prefill.experiment("exp").is_some());
    }

    #[test]
    fn test_populate_from_catalog() {
        let prefill = PrefillController::new(MemorySnapshotCache::new());
        let mut catalog = CohortCatalog::default();
        catalog.insert("listed", vec!["b".to_string(), "c".to_string()]);
        catalog.insert("bare", Vec::new());
        prefill.populate_experiments_if_needed(&catalog);

        let listed = prefill.experiment("listed").unwrap();
        assert_eq!(listed.values["cohort"], "b");
        assert_eq!(listed.available_cohorts, vec!["b", "c"]);
        assert_eq!(prefill.experiment("bare").unwrap().values["cohort"], "control");
    }

    #[test]
    fn test_delete_and_clear() {
        let prefill = PrefillController::new(MemorySnapshotCache::new());
        prefill.add_experiments(&[ExperimentSnapshot {
            name: "e".to_string(),
            values: json!({"cohort": "A"}).as_object().cloned().unwrap(),
            available_cohorts: Vec::new(),
        }]);
        prefill.add_features(&[feature("f")]);

        assert!(prefill.delete_experiment("e"));
        assert!(!prefill.delete_experiment("e"));
        prefill.clear_features();
        assert!(prefill.features_unique([]).is_empty());
    }
}
