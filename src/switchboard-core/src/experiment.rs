//! Experiment entity and its durable lifecycle.
//!
//! The in-memory [`Experiment`] only holds the name, values, selectable
//! cohorts and dependencies. Whether it has been started or completed lives in
//! the [`StateStore`](crate::StateStore) under `isStarted` / `isCompleted`, so
//! the lifecycle survives restarts and is shared by every copy of the same
//! experiment.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;
use tracing::debug;

use crate::context::EntityContext;
use crate::entity::{self, Entity, EntityKind, EntityRef, EntitySet, Partition, Values};
use crate::error::{EntityError, Result};
use crate::history::EntityHistory;
use crate::keys;
use crate::logging::log_dangerous_call;
use crate::registry::Switchboard;
use crate::snapshot::ExperimentSnapshot;

/// Lifecycle position of an experiment, derived from its durable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperimentState {
    Entitled,
    Active,
    Completed,
}

impl ExperimentState {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Entitled => "Entitled to start",
            Self::Active => "Started",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for ExperimentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A named A/B test with a mandatory cohort assignment.
#[derive(Clone)]
pub struct Experiment {
    name: String,
    values: Values,
    available_cohorts: Vec<String>,
    dependencies: BTreeMap<String, Experiment>,
    context: EntityContext,
}

impl Experiment {
    /// Create an experiment. Fails unless `values["cohort"]` is a string.
    pub fn new(
        name: impl Into<String>,
        values: Values,
        available_cohorts: Option<Vec<String>>,
        context: &EntityContext,
    ) -> Result<Self> {
        let name = name.into();
        if !values.get(keys::COHORT).is_some_and(Value::is_string) {
            return Err(EntityError::MissingCohort(name));
        }
        Ok(Self {
            name,
            values,
            available_cohorts: available_cohorts.unwrap_or_default(),
            dependencies: BTreeMap::new(),
            context: context.clone(),
        })
    }

    /// Create an experiment whose only value is its cohort.
    pub fn with_cohort(
        name: impl Into<String>,
        cohort: impl Into<String>,
        context: &EntityContext,
    ) -> Result<Self> {
        let mut values = Values::new();
        values.insert(keys::COHORT.to_string(), Value::String(cohort.into()));
        Self::new(name, values, None, context)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Assigned cohort.
    pub fn cohort(&self) -> &str {
        self.values
            .get(keys::COHORT)
            .and_then(Value::as_str)
            .unwrap_or(keys::NO_COHORT_GIVEN)
    }

    pub fn available_cohorts(&self) -> &[String] {
        &self.available_cohorts
    }

    pub fn set_available_cohorts(&mut self, cohorts: Vec<String>) {
        self.available_cohorts = cohorts;
    }

    // ========================================================================
    // Durable state
    // ========================================================================

    pub fn is_started(&self) -> bool {
        self.context.store().read(&self.name, keys::IS_STARTED)
    }

    pub fn is_completed(&self) -> bool {
        self.context.store().read(&self.name, keys::IS_COMPLETED)
    }

    /// Started and not yet completed.
    pub fn is_active(&self) -> bool {
        self.is_started() && !self.is_completed()
    }

    /// Neither running nor finished.
    pub fn is_entitled(&self) -> bool {
        !self.is_active() && !self.is_completed()
    }

    pub fn state(&self) -> ExperimentState {
        if self.is_completed() {
            ExperimentState::Completed
        } else if self.is_active() {
            ExperimentState::Active
        } else {
            ExperimentState::Entitled
        }
    }

    pub fn can_be_started(&self) -> bool {
        !self.context.gates().prevents_experiment(&self.name)
            && self.dependencies.values().all(Experiment::is_completed)
            && self.is_entitled()
    }

    pub fn can_be_completed(&self) -> bool {
        self.is_active()
    }

    /// Start the experiment. Returns `false` without effect when it cannot be
    /// started.
    pub fn start(&self) -> bool {
        if !self.can_be_started() {
            debug!(experiment = %self.name, state = %self.state(), "Experiment cannot be started");
            return false;
        }
        self.context
            .store()
            .save(Some(true), &self.name, keys::IS_STARTED);
        debug!(experiment = %self.name, cohort = %self.cohort(), "Experiment started");

        if self.should_track_analytics() {
            if let Some(analytics) = self.context.analytics() {
                analytics.track_started(self);
            }
        }
        true
    }

    /// Complete a running experiment. Returns `false` without effect unless
    /// it is active.
    pub fn complete(&self) -> bool {
        if !self.can_be_completed() {
            debug!(experiment = %self.name, state = %self.state(), "Experiment cannot be completed");
            return false;
        }
        self.context
            .store()
            .save(Some(true), &self.name, keys::IS_COMPLETED);
        debug!(experiment = %self.name, cohort = %self.cohort(), "Experiment completed");

        if self.should_track_analytics() {
            if let Some(analytics) = self.context.analytics() {
                analytics.track_completed(self);
            }
        }
        true
    }

    /// Reset the durable flags so the experiment is entitled again.
    pub fn clear_state(&self) {
        log_dangerous_call(
            self.context.log_dangerous_calls(),
            "Experiment::clear_state",
            &self.name,
        );
        let store = self.context.store();
        store.save(Some(false), &self.name, keys::IS_STARTED);
        store.save(Some(false), &self.name, keys::IS_COMPLETED);
    }

    // ========================================================================
    // Dependencies
    // ========================================================================

    pub fn dependencies(&self) -> impl Iterator<Item = &Experiment> {
        self.dependencies.values()
    }

    /// Require `dependency` to be completed before this experiment can start.
    ///
    /// Rejects self-dependencies and dependencies whose own copies already
    /// depend on this experiment, directly or transitively. Copies taken
    /// before an edge was added do not see it; use
    /// [`Switchboard::add_dependency`](crate::Switchboard::add_dependency) to
    /// check against every registered experiment. Re-adding a dependency
    /// replaces the stored copy.
    pub fn add_dependency(&mut self, dependency: Experiment) -> Result<()> {
        if dependency.name == self.name {
            return Err(EntityError::SelfDependency(self.name.clone()));
        }
        if dependency.depends_on(&self.name) {
            return Err(EntityError::DependencyCycle {
                experiment: self.name.clone(),
                dependency: dependency.name,
            });
        }
        self.dependencies.insert(dependency.name.clone(), dependency);
        Ok(())
    }

    pub fn remove_dependency(&mut self, name: &str) -> Option<Experiment> {
        self.dependencies.remove(name)
    }

    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
    }

    /// Whether `name` appears anywhere in the dependency tree.
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies
            .values()
            .any(|dep| dep.name == name || dep.depends_on(name))
    }

    // ========================================================================
    // Analytics
    // ========================================================================

    pub fn should_track_analytics(&self) -> bool {
        let disabled = self
            .values
            .get(keys::DISABLE_ANALYTICS)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.context.analytics().is_some() && !disabled
    }

    pub fn track(&self, event: &str, properties: Option<&Values>) {
        if !self.should_track_analytics() {
            return;
        }
        if let Some(analytics) = self.context.analytics() {
            analytics.track(event, EntityRef::Experiment(self), properties);
        }
    }
}

impl Entity for Experiment {
    const KIND: EntityKind = EntityKind::Experiment;

    fn name(&self) -> &str {
        &self.name
    }

    fn to_json(&self) -> Value {
        let mut body = Values::new();
        body.insert(keys::VALUES.to_string(), Value::Object(self.values.clone()));
        body.insert(
            keys::AVAILABLE_COHORTS.to_string(),
            Value::from(self.available_cohorts.clone()),
        );
        entity::named_entry(&self.name, body)
    }

    fn set_values(&mut self, values: Values) {
        self.values = values;
    }

    fn as_entity_ref(&self) -> EntityRef<'_> {
        EntityRef::Experiment(self)
    }

    fn record_all<'a>(experiments: impl IntoIterator<Item = &'a Self>, history: &dyn EntityHistory)
    where
        Self: 'a,
    {
        let snapshots: Vec<ExperimentSnapshot> =
            experiments.into_iter().map(ExperimentSnapshot::from).collect();
        if !snapshots.is_empty() {
            history.record_experiments(&snapshots);
        }
    }

    fn clear_durable_state(&self) {
        self.clear_state();
    }

    fn active(switchboard: &Switchboard) -> &EntitySet<Self> {
        &switchboard.experiments
    }

    fn inactive(switchboard: &Switchboard) -> &EntitySet<Self> {
        &switchboard.inactive_experiments
    }

    fn partition(switchboard: &mut Switchboard) -> Partition<'_, Self> {
        Partition {
            active: &mut switchboard.experiments,
            inactive: &mut switchboard.inactive_experiments,
        }
    }
}

impl PartialEq for Experiment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Experiment {}

impl Hash for Experiment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("values", &self.values)
            .field("available_cohorts", &self.available_cohorts)
            .field(
                "dependencies",
                &self.dependencies.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
