//! Conversion of the registry back into the configuration JSON.

use serde_json::Value;
use tracing::warn;

use crate::entity::{Entity, EntitySet, Values};
use crate::keys;
use crate::registry::Switchboard;

/// Serialize all four sets, tagging each entry with `isActive`.
///
/// Features are written after experiments, so a feature wins when both kinds
/// share a name. [`Switchboard::add`] refuses such clashes; any that remain
/// are logged.
pub fn configuration_json(switchboard: &Switchboard) -> Value {
    let mut config = Values::new();
    append(&mut config, switchboard.experiments(), true);
    append(&mut config, switchboard.inactive_experiments(), false);
    append(&mut config, switchboard.features(), true);
    append(&mut config, switchboard.inactive_features(), false);
    Value::Object(config)
}

fn append<E: Entity>(config: &mut Values, set: &EntitySet<E>, active: bool) {
    for entity in set {
        let Value::Object(mut wrapper) = entity.to_json() else {
            continue;
        };
        let Some(Value::Object(mut entry)) = wrapper.remove(entity.name()) else {
            continue;
        };
        entry.insert(keys::IS_ACTIVE.to_string(), Value::Bool(active));
        if config
            .insert(entity.name().to_string(), Value::Object(entry))
            .is_some()
        {
            warn!(kind = %E::KIND, name = %entity.name(), "Entry replaced an earlier one with the same name");
        }
    }
}
