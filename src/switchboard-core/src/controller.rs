//! Debug controller: the sanctioned writer that moves entities between the
//! registry's active and inactive sets and keeps the debug cache in sync.

use tracing::{debug, info};

use crate::cache::{ACTIVE_NAMESPACE, INACTIVE_NAMESPACE, SnapshotCache};
use crate::entity::{Entity, EntitySet, Values};
use crate::experiment::Experiment;
use crate::feature::Feature;
use crate::registry::Switchboard;
use crate::snapshot::{ExperimentSnapshot, FeatureSnapshot};

/// Mutation API over a [`Switchboard`] backed by a debug [`SnapshotCache`].
///
/// Operations are name based: passing a fresh instance whose name matches an
/// entity already in the registry acts on the registered one.
pub struct DebugController<'a> {
    switchboard: &'a mut Switchboard,
    cache: &'a dyn SnapshotCache,
}

impl<'a> DebugController<'a> {
    pub fn new(switchboard: &'a mut Switchboard, cache: &'a dyn SnapshotCache) -> Self {
        Self { switchboard, cache }
    }

    pub fn switchboard(&self) -> &Switchboard {
        self.switchboard
    }

    // ========================================================================
    // Generic entity operations
    // ========================================================================

    /// Whether an entity with this name is in either set.
    pub fn exists<E: Entity>(&self, entity: &E) -> bool {
        let name = entity.name();
        E::active(self.switchboard).contains(name) || E::inactive(self.switchboard).contains(name)
    }

    /// Entity with this name from either set, and whether it is active.
    pub fn find<E: Entity>(&self, name: &str) -> Option<(&E, bool)> {
        if let Some(entity) = E::active(self.switchboard).get(name) {
            return Some((entity, true));
        }
        E::inactive(self.switchboard)
            .get(name)
            .map(|entity| (entity, false))
    }

    /// Move an entity into the active set.
    pub fn activate<E: Entity>(&mut self, entity: E) {
        debug!(kind = %E::KIND, name = %entity.name(), "Activating");
        if let Some(history) = self.switchboard.context().history() {
            entity.record_into(history.as_ref());
        }
        let partition = E::partition(self.switchboard);
        partition.inactive.remove(entity.name());
        partition.active.insert(entity);
    }

    /// Move an entity into the inactive set. The registered copy is kept when
    /// one exists.
    pub fn deactivate<E: Entity>(&mut self, entity: E) {
        debug!(kind = %E::KIND, name = %entity.name(), "Deactivating");
        let partition = E::partition(self.switchboard);
        let entity = partition.active.remove(entity.name()).unwrap_or(entity);
        partition.inactive.insert(entity);
    }

    /// Remove an entity from both sets and drop its durable state.
    pub fn delete<E: Entity>(&mut self, entity: &E) {
        debug!(kind = %E::KIND, name = %entity.name(), "Deleting");
        entity.clear_durable_state();
        let partition = E::partition(self.switchboard);
        partition.active.remove(entity.name());
        partition.inactive.remove(entity.name());
    }

    /// Deactivate the active entity with this name, or activate `entity` when
    /// none is active. Returns whether the name ends up active.
    pub fn toggle<E: Entity>(&mut self, entity: E) -> bool {
        if E::active(self.switchboard).contains(entity.name()) {
            self.deactivate(entity);
            false
        } else {
            self.activate(entity);
            true
        }
    }

    /// Replace the values of the named entity in whichever set holds it.
    pub fn change_values<E: Entity>(&mut self, name: &str, values: Values) -> bool {
        let partition = E::partition(self.switchboard);
        let target = match partition.active.get_mut(name) {
            Some(entity) => Some(entity),
            None => partition.inactive.get_mut(name),
        };
        match target {
            Some(entity) => {
                entity.set_values(values);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Kind-specific helpers
    // ========================================================================

    pub fn find_experiment(&self, name: &str) -> Option<&Experiment> {
        self.find::<Experiment>(name).map(|(experiment, _)| experiment)
    }

    pub fn find_feature(&self, name: &str) -> Option<&Feature> {
        self.find::<Feature>(name).map(|(feature, _)| feature)
    }

    /// Replace the selectable cohorts of the named experiment.
    pub fn update_available_cohorts(&mut self, name: &str, cohorts: Vec<String>) -> bool {
        let switchboard = &mut *self.switchboard;
        let target = match switchboard.experiments.get_mut(name) {
            Some(experiment) => Some(experiment),
            None => switchboard.inactive_experiments.get_mut(name),
        };
        match target {
            Some(experiment) => {
                experiment.set_available_cohorts(cohorts);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Cache
    // ========================================================================

    /// Snapshot both partitions into the debug cache and mark the registry
    /// as debugging, so the next start restores from the cache.
    pub fn cache_all(&self) {
        let switchboard = &*self.switchboard;
        self.cache.cache(
            &experiment_snapshots(&switchboard.experiments),
            &feature_snapshots(&switchboard.features),
            Some(ACTIVE_NAMESPACE),
        );
        self.cache.cache(
            &experiment_snapshots(&switchboard.inactive_experiments),
            &feature_snapshots(&switchboard.inactive_features),
            Some(INACTIVE_NAMESPACE),
        );
        switchboard.set_debugging(true);
        debug!("Cached debug state");
    }

    /// Drop the debug cache and empty every set of the registry.
    pub fn clear_cache_and_switchboard(&mut self) {
        self.cache.clear(Some(ACTIVE_NAMESPACE));
        self.cache.clear(Some(INACTIVE_NAMESPACE));

        let switchboard = &mut *self.switchboard;
        switchboard.experiments.clear();
        switchboard.inactive_experiments.clear();
        switchboard.features.clear();
        switchboard.inactive_features.clear();
        switchboard.set_debugging(false);
        info!("Cleared debug cache and switchboard");
    }
}

/// Restore the registry from the debug cache when it was left in debugging
/// mode. Returns whether a restore was attempted.
///
/// Each slot that restores replaces the matching set. Snapshots go through
/// the regular constructors; entries that no longer validate are dropped. A
/// name found in both partitions stays active only.
pub fn restore_debug_cache(switchboard: &mut Switchboard, cache: &dyn SnapshotCache) -> bool {
    if !switchboard.is_debugging() {
        return false;
    }
    let context = switchboard.context().clone();
    let (active_experiments, active_features) = cache.restore(Some(ACTIVE_NAMESPACE));
    let (inactive_experiments, inactive_features) = cache.restore(Some(INACTIVE_NAMESPACE));

    if let Some(snapshots) = active_experiments {
        switchboard.experiments = snapshots
            .iter()
            .filter_map(|s| s.restore(&context).ok())
            .collect();
    }
    if let Some(snapshots) = inactive_experiments {
        switchboard.inactive_experiments = snapshots
            .iter()
            .filter_map(|s| s.restore(&context).ok())
            .collect();
    }
    if let Some(snapshots) = active_features {
        switchboard.features = snapshots
            .iter()
            .filter_map(|s| s.restore(&context).ok())
            .collect();
    }
    if let Some(snapshots) = inactive_features {
        switchboard.inactive_features = snapshots
            .iter()
            .filter_map(|s| s.restore(&context).ok())
            .collect();
    }

    dedupe(&switchboard.experiments, &mut switchboard.inactive_experiments);
    dedupe(&switchboard.features, &mut switchboard.inactive_features);

    info!(
        experiments = switchboard.experiments.len(),
        inactive_experiments = switchboard.inactive_experiments.len(),
        features = switchboard.features.len(),
        inactive_features = switchboard.inactive_features.len(),
        "Restored debug cache"
    );
    true
}

fn dedupe<E: Entity>(active: &EntitySet<E>, inactive: &mut EntitySet<E>) {
    for name in active.names() {
        inactive.remove(name);
    }
}

fn experiment_snapshots(set: &EntitySet<Experiment>) -> Vec<ExperimentSnapshot> {
    set.iter().map(ExperimentSnapshot::from).collect()
}

fn feature_snapshots(set: &EntitySet<Feature>) -> Vec<FeatureSnapshot> {
    set.iter().map(FeatureSnapshot::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySnapshotCache;
    use crate::context::EntityContext;

    fn feature(name: &str, switchboard: &Switchboard) -> Feature {
        Feature::new(name, None, switchboard.context()).unwrap()
    }

    #[test]
    fn test_activate_and_deactivate_keep_sets_disjoint() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = Switchboard::default();
        let f1 = feature("f1", &switchboard);
        let mut controller = DebugController::new(&mut switchboard, &cache);

        controller.deactivate(f1.clone());
        assert!(controller.exists(&f1));
        assert_eq!(controller.find::<Feature>("f1").map(|(_, a)| a), Some(false));

        controller.activate(f1.clone());
        assert_eq!(controller.find::<Feature>("f1").map(|(_, a)| a), Some(true));
        assert!(controller.switchboard().inactive_features().is_empty());
    }

    #[test]
    fn test_toggle_is_name_based() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = Switchboard::default();
        let ctx = switchboard.context().clone();
        let original = Feature::new(
            "f1",
            Some(serde_json::json!({"v": 1}).as_object().cloned().unwrap()),
            &ctx,
        )
        .unwrap();
        let mut controller = DebugController::new(&mut switchboard, &cache);
        controller.activate(original);

        let fresh = Feature::new("f1", None, &ctx).unwrap();
        assert!(!controller.toggle(fresh));

        let switchboard = controller.switchboard();
        assert!(switchboard.features().is_empty());
        let moved = switchboard.inactive_features().get("f1").unwrap();
        assert!(moved.values().is_some());
    }

    #[test]
    fn test_delete_clears_experiment_state() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = Switchboard::default();
        let exp = Experiment::with_cohort("exp", "A", switchboard.context()).unwrap();
        let mut controller = DebugController::new(&mut switchboard, &cache);
        controller.activate(exp.clone());
        assert!(exp.start());

        controller.delete(&exp);
        assert!(!controller.exists(&exp));
        assert!(exp.is_entitled());

        controller.activate(exp.clone());
        assert!(controller.find_experiment("exp").unwrap().start());
    }

    #[test]
    fn test_change_values_and_cohorts() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = Switchboard::default();
        let exp = Experiment::with_cohort("exp", "A", switchboard.context()).unwrap();
        let mut controller = DebugController::new(&mut switchboard, &cache);
        controller.deactivate(exp);

        let values = serde_json::json!({"cohort": "B"}).as_object().cloned().unwrap();
        assert!(controller.change_values::<Experiment>("exp", values));
        assert!(controller.update_available_cohorts("exp", vec!["A".into(), "B".into()]));
        assert!(!controller.change_values::<Feature>("exp", Values::new()));

        let exp = controller.find_experiment("exp").unwrap();
        assert_eq!(exp.cohort(), "B");
        assert_eq!(exp.available_cohorts().len(), 2);
    }

    #[test]
    fn test_cache_all_and_restore() {
        let cache = MemorySnapshotCache::new();
        let context = EntityContext::default();
        let mut switchboard = Switchboard::new(context.clone());
        {
            let mut controller = DebugController::new(&mut switchboard, &cache);
            controller.activate(Feature::new("on", None, &context).unwrap());
            controller.deactivate(Experiment::with_cohort("off", "A", &context).unwrap());
            controller.cache_all();
        }
        assert!(switchboard.is_debugging());

        let mut restored = Switchboard::new(context);
        assert!(restore_debug_cache(&mut restored, &cache));
        assert!(restored.is_enabled("on", false));
        assert!(restored.inactive_experiments().contains("off"));
    }

    #[test]
    fn test_restore_skipped_when_not_debugging() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = Switchboard::default();
        assert!(!restore_debug_cache(&mut switchboard, &cache));
    }

    #[test]
    fn test_clear_cache_and_switchboard() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = Switchboard::default();
        let f = feature("f", &switchboard);
        let mut controller = DebugController::new(&mut switchboard, &cache);
        controller.activate(f);
        controller.cache_all();

        controller.clear_cache_and_switchboard();
        assert!(controller.switchboard().features().is_empty());
        assert!(!controller.switchboard().is_debugging());
        assert_eq!(cache.restore(Some(ACTIVE_NAMESPACE)), (None, None));
    }
}
