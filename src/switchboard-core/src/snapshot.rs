//! Plain records of entities, used by caches and the prefill history.
//!
//! A snapshot carries only the persisted fields. Turning it back into an
//! entity goes through the regular constructors, so a snapshot that no longer
//! satisfies the entity invariants fails to restore.

use serde::{Deserialize, Serialize};

use crate::context::EntityContext;
use crate::entity::Values;
use crate::error::Result;
use crate::experiment::Experiment;
use crate::feature::Feature;

/// Persisted form of a [`Feature`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub name: String,
    #[serde(default)]
    pub values: Option<Values>,
}

impl FeatureSnapshot {
    pub fn restore(&self, context: &EntityContext) -> Result<Feature> {
        Feature::new(self.name.clone(), self.values.clone(), context)
    }
}

impl From<&Feature> for FeatureSnapshot {
    fn from(feature: &Feature) -> Self {
        Self {
            name: feature.name().to_string(),
            values: feature.values().cloned(),
        }
    }
}

/// Persisted form of an [`Experiment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSnapshot {
    pub name: String,
    #[serde(default)]
    pub values: Values,
    #[serde(default, rename = "availableCohorts")]
    pub available_cohorts: Vec<String>,
}

impl ExperimentSnapshot {
    pub fn restore(&self, context: &EntityContext) -> Result<Experiment> {
        Experiment::new(
            self.name.clone(),
            self.values.clone(),
            Some(self.available_cohorts.clone()),
            context,
        )
    }
}

impl From<&Experiment> for ExperimentSnapshot {
    fn from(experiment: &Experiment) -> Self {
        Self {
            name: experiment.name().to_string(),
            values: experiment.values().clone(),
            available_cohorts: experiment.available_cohorts().to_vec(),
        }
    }
}
