//! The switchboard registry.
//!
//! Holds four name-keyed sets: active and inactive experiments, active and
//! inactive features. A name lives in at most one set of each active/inactive
//! pair. Writes go through [`Switchboard::add`], [`Switchboard::remove`],
//! [`Switchboard::load_configuration`] or the
//! [`DebugController`](crate::DebugController).

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::ConfigurationClient;
use crate::context::EntityContext;
use crate::entity::{Entity, EntityKind, EntityRef, EntitySet, Values};
use crate::error::{ClientError, EntityError};
use crate::experiment::Experiment;
use crate::factory;
use crate::feature::Feature;
use crate::keys;
use crate::logging::log_dangerous_call;
use crate::transformer;

/// Registry of the experiments and features that apply to a person.
#[derive(Debug)]
pub struct Switchboard {
    pub(crate) experiments: EntitySet<Experiment>,
    pub(crate) inactive_experiments: EntitySet<Experiment>,
    pub(crate) features: EntitySet<Feature>,
    pub(crate) inactive_features: EntitySet<Feature>,
    context: EntityContext,
}

impl Switchboard {
    pub fn new(context: EntityContext) -> Self {
        Self {
            experiments: EntitySet::new(),
            inactive_experiments: EntitySet::new(),
            features: EntitySet::new(),
            inactive_features: EntitySet::new(),
            context,
        }
    }

    /// Context handed to entities created for this registry.
    pub fn context(&self) -> &EntityContext {
        &self.context
    }

    // ========================================================================
    // Gating
    // ========================================================================

    /// Install a predicate that hides experiments and stops them starting.
    pub fn prevent_experiments<F>(&self, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.context.gates().set_experiment_gate(predicate);
    }

    /// Install a predicate that reports features as disabled.
    pub fn prevent_features<F>(&self, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.context.gates().set_feature_gate(predicate);
    }

    pub fn clear_gates(&self) {
        let gates = self.context.gates();
        gates.clear_experiment_gate();
        gates.clear_feature_gate();
    }

    // ========================================================================
    // Debugging flag
    // ========================================================================

    /// Whether the sets were last written by debug tooling and should be
    /// restored from the debug cache at startup.
    pub fn is_debugging(&self) -> bool {
        self.context
            .store()
            .read(keys::REGISTRY_ENTITY, keys::IS_DEBUGGING)
    }

    pub(crate) fn set_debugging(&self, debugging: bool) {
        self.context
            .store()
            .save(Some(debugging), keys::REGISTRY_ENTITY, keys::IS_DEBUGGING);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether the person is in the named experiment.
    pub fn is_in(&self, experiment: &str, default: bool) -> bool {
        if self.context.gates().prevents_experiment(experiment) {
            return false;
        }
        if self.experiments.contains(experiment) {
            return true;
        }
        default
    }

    pub fn is_not_in(&self, experiment: &str, default: bool) -> bool {
        if self.context.gates().prevents_experiment(experiment) {
            return true;
        }
        if self.experiments.contains(experiment) {
            return false;
        }
        default
    }

    /// Whether the named feature is enabled for the person.
    pub fn is_enabled(&self, feature: &str, default: bool) -> bool {
        if self.context.gates().prevents_feature(feature) {
            return false;
        }
        if self.features.contains(feature) {
            return true;
        }
        default
    }

    pub fn is_not_enabled(&self, feature: &str, default: bool) -> bool {
        if self.context.gates().prevents_feature(feature) {
            return true;
        }
        if self.features.contains(feature) {
            return false;
        }
        default
    }

    /// Active experiment with the given name.
    pub fn experiment(&self, name: &str) -> Option<&Experiment> {
        self.experiments.get(name)
    }

    /// Active feature with the given name.
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn experiments(&self) -> &EntitySet<Experiment> {
        &self.experiments
    }

    pub fn inactive_experiments(&self) -> &EntitySet<Experiment> {
        &self.inactive_experiments
    }

    pub fn features(&self) -> &EntitySet<Feature> {
        &self.features
    }

    pub fn inactive_features(&self) -> &EntitySet<Feature> {
        &self.inactive_features
    }

    /// Find an entity of either kind in any set. The flag tells whether it
    /// was found in an active set. Experiments are searched first.
    pub fn lookup(&self, name: &str) -> Option<(EntityRef<'_>, bool)> {
        if let Some(experiment) = self.experiments.get(name) {
            return Some((EntityRef::Experiment(experiment), true));
        }
        if let Some(experiment) = self.inactive_experiments.get(name) {
            return Some((EntityRef::Experiment(experiment), false));
        }
        if let Some(feature) = self.features.get(name) {
            return Some((EntityRef::Feature(feature), true));
        }
        self.inactive_features
            .get(name)
            .map(|feature| (EntityRef::Feature(feature), false))
    }

    // ========================================================================
    // Direct mutation
    // ========================================================================

    /// Add an entity to the active set, bypassing the server configuration.
    ///
    /// Any inactive entry with the same name is dropped. The entity is also
    /// recorded into the prefill history. Refused when an entity of the other
    /// kind already holds the name.
    pub fn add<E: Entity>(&mut self, entity: E) -> bool {
        log_dangerous_call(
            self.context.log_dangerous_calls(),
            "Switchboard::add",
            entity.name(),
        );
        if self.held_by_other_kind::<E>(entity.name()) {
            warn!(kind = %E::KIND, name = %entity.name(), "Name already used by the other kind");
            return false;
        }
        if let Some(history) = self.context.history() {
            entity.record_into(history.as_ref());
        }

        let partition = E::partition(self);
        partition.inactive.remove(entity.name());
        partition.active.insert(entity)
    }

    /// Whether an entity of the other kind than `E` holds `name`.
    pub fn held_by_other_kind<E: Entity>(&self, name: &str) -> bool {
        match E::KIND {
            EntityKind::Experiment => {
                self.features.contains(name) || self.inactive_features.contains(name)
            }
            EntityKind::Feature => {
                self.experiments.contains(name) || self.inactive_experiments.contains(name)
            }
        }
    }

    /// Make `experiment` depend on `dependency`, both looked up in either set.
    ///
    /// The cycle check walks the registry's own experiments, so it sees every
    /// edge added so far.
    pub fn add_dependency(&mut self, experiment: &str, dependency: &str) -> crate::Result<()> {
        if experiment == dependency {
            return Err(EntityError::SelfDependency(experiment.to_string()));
        }
        let Some(dep) = self.any_experiment(dependency).cloned() else {
            return Err(EntityError::UnknownExperiment(dependency.to_string()));
        };
        if self.any_experiment(experiment).is_none() {
            return Err(EntityError::UnknownExperiment(experiment.to_string()));
        }
        if self.reaches(dependency, experiment) {
            return Err(EntityError::DependencyCycle {
                experiment: experiment.to_string(),
                dependency: dependency.to_string(),
            });
        }

        let target = match self.experiments.get_mut(experiment) {
            Some(target) => target,
            None => self
                .inactive_experiments
                .get_mut(experiment)
                .ok_or_else(|| EntityError::UnknownExperiment(experiment.to_string()))?,
        };
        target.add_dependency(dep)
    }

    fn any_experiment(&self, name: &str) -> Option<&Experiment> {
        self.experiments
            .get(name)
            .or_else(|| self.inactive_experiments.get(name))
    }

    /// Whether `target` is reachable from `from` along registry dependencies.
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut pending = vec![from.to_string()];
        let mut seen = HashSet::new();
        while let Some(name) = pending.pop() {
            if name == target {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(experiment) = self.any_experiment(&name) {
                pending.extend(experiment.dependencies().map(|dep| dep.name().to_string()));
            }
        }
        false
    }

    /// Remove an entity from the active set. Inactive entries are untouched.
    pub fn remove<E: Entity>(&mut self, entity: &E) -> bool {
        log_dangerous_call(
            self.context.log_dangerous_calls(),
            "Switchboard::remove",
            entity.name(),
        );
        E::partition(self).active.remove(entity.name()).is_some()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replace all four sets with the contents of a configuration JSON.
    ///
    /// Decoded entities are recorded into the prefill history and the
    /// analytics provider is told which active entities the person is
    /// entitled to.
    pub fn load_configuration(&mut self, json: &Value) {
        self.experiments = factory::experiments_from_json(json, &self.context, true);
        self.inactive_experiments = factory::experiments_from_json(json, &self.context, false);
        self.features = factory::features_from_json(json, &self.context, true);
        self.inactive_features = factory::features_from_json(json, &self.context, false);

        info!(
            experiments = self.experiments.len(),
            inactive_experiments = self.inactive_experiments.len(),
            features = self.features.len(),
            inactive_features = self.inactive_features.len(),
            "Loaded configuration"
        );

        if let Some(analytics) = self.context.analytics() {
            analytics.entitled(&self.experiments, &self.features);
        }
    }

    /// Download the configuration for `uuid` and load it.
    ///
    /// The sets are left untouched when the download fails.
    pub fn activate(
        &mut self,
        client: &dyn ConfigurationClient,
        uuid: &str,
        user_data: Option<&Values>,
    ) -> Result<(), ClientError> {
        debug!(uuid = %uuid, "Downloading configuration");
        let json = client.download_configuration(uuid, user_data)?;
        if !json.is_object() {
            return Err(ClientError::InvalidPayload(
                "expected a JSON object at the top level".to_string(),
            ));
        }
        self.load_configuration(&json);
        Ok(())
    }

    /// Current sets as a configuration JSON, reloadable with
    /// [`Switchboard::load_configuration`].
    pub fn to_configuration(&self) -> Value {
        transformer::configuration_json(self)
    }
}

impl Default for Switchboard {
    fn default() -> Self {
        Self::new(EntityContext::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_refuses_name_of_other_kind() {
        let mut switchboard = Switchboard::default();
        let feature = Feature::new("x", None, switchboard.context()).unwrap();
        assert!(switchboard.add(feature));

        let exp = Experiment::with_cohort("x", "A", switchboard.context()).unwrap();
        assert!(!switchboard.add(exp));
        assert!(switchboard.experiment("x").is_none());
        assert!(switchboard.held_by_other_kind::<Experiment>("x"));
        assert_eq!(
            switchboard.to_configuration(),
            json!({"x": {"values": null, "isActive": true}})
        );
    }

    #[test]
    fn test_dependency_cycle_seen_through_registry() {
        let mut switchboard = Switchboard::default();
        switchboard.load_configuration(&json!({
            "a": {"values": {"cohort": "A"}, "isActive": true},
            "b": {"values": {"cohort": "A"}, "isActive": false},
            "c": {"values": {"cohort": "A"}, "isActive": true},
        }));

        switchboard.add_dependency("a", "b").unwrap();
        switchboard.add_dependency("b", "c").unwrap();
        assert!(matches!(
            switchboard.add_dependency("c", "a"),
            Err(EntityError::DependencyCycle { .. })
        ));
        assert_eq!(
            switchboard.add_dependency("a", "a"),
            Err(EntityError::SelfDependency("a".to_string()))
        );
        assert_eq!(
            switchboard.add_dependency("a", "missing"),
            Err(EntityError::UnknownExperiment("missing".to_string()))
        );
        assert!(!switchboard.experiment("a").unwrap().can_be_started());
    }

    #[test]
    fn test_gate_hides_present_experiment() {
        let mut switchboard = Switchboard::default();
        let exp = Experiment::with_cohort("exp1", "A", switchboard.context()).unwrap();
        switchboard.add(exp);
        switchboard.prevent_experiments(|name| name == "exp1");

        assert!(!switchboard.is_in("exp1", false));
        assert!(switchboard.is_not_in("exp1", false));
        assert!(switchboard.experiment("exp1").is_some());
    }

    #[test]
    fn test_defaults_when_absent() {
        let switchboard = Switchboard::default();
        assert!(switchboard.is_in("missing", true));
        assert!(!switchboard.is_not_in("missing", false));
        assert!(!switchboard.is_enabled("missing", false));
        assert!(switchboard.is_not_enabled("missing", true));
    }

    #[test]
    fn test_feature_queries_and_gate() {
        let mut switchboard = Switchboard::default();
        let feature = Feature::new("f1", None, switchboard.context()).unwrap();
        switchboard.add(feature.clone());

        assert!(switchboard.is_enabled("f1", false));
        assert!(!switchboard.is_not_enabled("f1", true));

        switchboard.prevent_features(|_| true);
        assert!(!switchboard.is_enabled("f1", true));
        assert!(switchboard.is_not_enabled("f1", false));

        switchboard.clear_gates();
        assert!(switchboard.remove(&feature));
        assert!(!switchboard.is_enabled("f1", false));
    }

    #[test]
    fn test_add_drops_inactive_entry() {
        let json = json!({"f1": {"values": null, "isActive": false}});
        let mut switchboard = Switchboard::default();
        switchboard.load_configuration(&json);
        assert!(switchboard.inactive_features().contains("f1"));

        let feature = Feature::new("f1", None, switchboard.context()).unwrap();
        switchboard.add(feature);
        assert!(switchboard.features().contains("f1"));
        assert!(!switchboard.inactive_features().contains("f1"));
    }

    #[test]
    fn test_lookup_reports_set() {
        let json = json!({
            "exp": {"values": {"cohort": "A"}, "isActive": false},
            "feat": {"values": {}, "isActive": true},
        });
        let mut switchboard = Switchboard::default();
        switchboard.load_configuration(&json);

        let (entity, active) = switchboard.lookup("exp").unwrap();
        assert_eq!(entity.kind(), crate::EntityKind::Experiment);
        assert!(!active);
        let (entity, active) = switchboard.lookup("feat").unwrap();
        assert_eq!(entity.kind(), crate::EntityKind::Feature);
        assert!(active);
        assert!(switchboard.lookup("nothing").is_none());
    }

    #[test]
    fn test_activate_rejects_non_object() {
        let mut switchboard = Switchboard::default();
        let client = |_: &str, _: Option<&Values>| Ok::<_, ClientError>(json!([1]));
        let err = switchboard.activate(&client, "uuid", None).unwrap_err();
        assert!(matches!(err, ClientError::InvalidPayload(_)));
    }

    #[test]
    fn test_activate_keeps_sets_on_failure() {
        let mut switchboard = Switchboard::default();
        switchboard.load_configuration(&json!({"f": {"isActive": true}}));

        let client = |_: &str, _: Option<&Values>| {
            Err::<Value, _>(ClientError::Download("offline".to_string()))
        };
        assert!(switchboard.activate(&client, "uuid", None).is_err());
        assert!(switchboard.is_enabled("f", false));
    }

    #[test]
    fn test_debugging_flag_persists_in_store() {
        let switchboard = Switchboard::default();
        assert!(!switchboard.is_debugging());
        switchboard.set_debugging(true);
        assert!(switchboard.is_debugging());
        assert!(
            switchboard
                .context()
                .store()
                .read(keys::REGISTRY_ENTITY, keys::IS_DEBUGGING)
        );
    }
}
