//! Feature entity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::Value;

use crate::analytics::AnalyticsProvider;
use crate::context::EntityContext;
use crate::entity::{self, Entity, EntityKind, EntityRef, EntitySet, Partition, Values};
use crate::error::{EntityError, Result};
use crate::history::EntityHistory;
use crate::keys;
use crate::registry::Switchboard;
use crate::snapshot::FeatureSnapshot;

/// A named capability with optional associated values.
///
/// Identity is the name alone: two features with the same name compare equal
/// whatever their values.
#[derive(Clone)]
pub struct Feature {
    name: String,
    values: Option<Values>,
    analytics: Option<Arc<dyn AnalyticsProvider>>,
}

impl Feature {
    /// Create a feature. Fails when `values` carries a `cohort`, since that
    /// payload describes an experiment.
    pub fn new(
        name: impl Into<String>,
        values: Option<Values>,
        context: &EntityContext,
    ) -> Result<Self> {
        let name = name.into();
        if values.as_ref().is_some_and(|v| v.contains_key(keys::COHORT)) {
            return Err(EntityError::UnexpectedCohort(name));
        }
        Ok(Self {
            name,
            values,
            analytics: context.analytics().cloned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> Option<&Values> {
        self.values.as_ref()
    }

    /// Look up a single value.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.as_ref()?.get(key)
    }

    /// Whether events for this feature reach the analytics provider.
    pub fn should_track_analytics(&self) -> bool {
        let disabled = self
            .value(keys::DISABLE_ANALYTICS)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.analytics.is_some() && !disabled
    }

    /// Forward a custom event to the analytics provider.
    pub fn track(&self, event: &str, properties: Option<&Values>) {
        if !self.should_track_analytics() {
            return;
        }
        if let Some(analytics) = &self.analytics {
            analytics.track(event, EntityRef::Feature(self), properties);
        }
    }
}

impl Entity for Feature {
    const KIND: EntityKind = EntityKind::Feature;

    fn name(&self) -> &str {
        &self.name
    }

    fn to_json(&self) -> Value {
        let values = match &self.values {
            Some(values) => Value::Object(values.clone()),
            None => Value::Null,
        };
        let mut body = Values::new();
        body.insert(keys::VALUES.to_string(), values);
        entity::named_entry(&self.name, body)
    }

    fn set_values(&mut self, values: Values) {
        self.values = Some(values);
    }

    fn as_entity_ref(&self) -> EntityRef<'_> {
        EntityRef::Feature(self)
    }

    fn record_all<'a>(features: impl IntoIterator<Item = &'a Self>, history: &dyn EntityHistory)
    where
        Self: 'a,
    {
        let snapshots: Vec<FeatureSnapshot> = features.into_iter().map(FeatureSnapshot::from).collect();
        if !snapshots.is_empty() {
            history.record_features(&snapshots);
        }
    }

    fn active(switchboard: &Switchboard) -> &EntitySet<Self> {
        &switchboard.features
    }

    fn inactive(switchboard: &Switchboard) -> &EntitySet<Self> {
        &switchboard.inactive_features
    }

    fn partition(switchboard: &mut Switchboard) -> Partition<'_, Self> {
        Partition {
            active: &mut switchboard.features,
            inactive: &mut switchboard.inactive_features,
        }
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Feature {}

impl Hash for Feature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("values", &self.values)
            .finish()
    }
}
