//! Shared entity plumbing: values, kinds and name-keyed sets.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde_json::Value;

use crate::experiment::Experiment;
use crate::feature::Feature;
use crate::history::EntityHistory;
use crate::registry::Switchboard;

/// Arbitrary values attached to an entity.
pub type Values = serde_json::Map<String, Value>;

/// Wrap an entity body as `{name: body}`.
pub(crate) fn named_entry(name: &str, body: Values) -> Value {
    let mut entry = Values::new();
    entry.insert(name.to_string(), Value::Object(body));
    Value::Object(entry)
}

/// The two kinds of entity a configuration can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Feature,
    Experiment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Experiment => "experiment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view over either kind of entity.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Feature(&'a Feature),
    Experiment(&'a Experiment),
}

impl<'a> EntityRef<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Feature(_) => EntityKind::Feature,
            Self::Experiment(_) => EntityKind::Experiment,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Feature(feature) => feature.name(),
            Self::Experiment(experiment) => experiment.name(),
        }
    }
}

/// Mutable access to an entity kind's active and inactive sets.
///
/// Only this crate can reach the sets, which keeps the controller and the
/// factory the sole writers of the registry.
pub struct Partition<'a, E> {
    pub(crate) active: &'a mut EntitySet<E>,
    pub(crate) inactive: &'a mut EntitySet<E>,
}

/// Behaviour shared by features and experiments.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    fn name(&self) -> &str;

    /// Wire representation: `{name: {"values": ..., ...}}`.
    fn to_json(&self) -> Value;

    /// Replace the values map without validation.
    fn set_values(&mut self, values: Values);

    fn as_entity_ref(&self) -> EntityRef<'_>;

    /// Record a batch of entities into the prefill history in one call.
    fn record_all<'a>(entities: impl IntoIterator<Item = &'a Self>, history: &dyn EntityHistory)
    where
        Self: 'a;

    /// Record this entity into the prefill history.
    fn record_into(&self, history: &dyn EntityHistory) {
        Self::record_all(std::iter::once(self), history);
    }

    /// Drop any durable state kept outside the entity.
    fn clear_durable_state(&self) {}

    fn active(switchboard: &Switchboard) -> &EntitySet<Self>;

    fn inactive(switchboard: &Switchboard) -> &EntitySet<Self>;

    fn partition(switchboard: &mut Switchboard) -> Partition<'_, Self>;
}

/// Set of entities, unique by name and iterated in name order.
#[derive(Debug, Clone)]
pub struct EntitySet<E> {
    entries: BTreeMap<String, E>,
}

impl<E: Entity> EntitySet<E> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&E> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut E> {
        self.entries.get_mut(name)
    }

    /// Insert an entity. An entity with the same name is kept as is and
    /// `false` is returned.
    pub fn insert(&mut self, entity: E) -> bool {
        match self.entries.entry(entity.name().to_string()) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entity);
                true
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<E> {
        self.entries.remove(name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, E> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<E: Entity> Default for EntitySet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> FromIterator<E> for EntitySet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut set = Self::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}

impl<E: Entity> Extend<E> for EntitySet<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for entity in iter {
            self.insert(entity);
        }
    }
}

impl<'a, E> IntoIterator for &'a EntitySet<E> {
    type Item = &'a E;
    type IntoIter = btree_map::Values<'a, String, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl<E> IntoIterator for EntitySet<E> {
    type Item = E;
    type IntoIter = btree_map::IntoValues<String, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
