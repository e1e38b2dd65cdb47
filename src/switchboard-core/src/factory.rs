//! Decoding of a configuration JSON into entity sets.
//!
//! The configuration maps entity names to
//! `{"values": {...}, "isActive": bool, "availableCohorts": [...]}`. Entries
//! that do not decode are skipped; a bad entry never aborts the rest.

use serde_json::Value;
use tracing::{debug, trace};

use crate::context::EntityContext;
use crate::entity::{Entity, EntitySet, Values};
use crate::experiment::Experiment;
use crate::feature::Feature;
use crate::keys;

/// Placeholder some servers send instead of a missing values object.
const NULL_PLACEHOLDER: &str = "<null>";

/// Decode the experiments whose `isActive` flag equals `active`.
///
/// An entry needs a `values` object holding a string `cohort`.
pub fn experiments_from_json(
    json: &Value,
    context: &EntityContext,
    active: bool,
) -> EntitySet<Experiment> {
    let set: EntitySet<Experiment> = entries(json, active)
        .filter_map(|(name, entry)| {
            let values = entry.get(keys::VALUES)?.as_object()?.clone();
            let cohorts = available_cohorts(entry);
            match Experiment::new(name.as_str(), values, cohorts, context) {
                Ok(experiment) => Some(experiment),
                Err(err) => {
                    trace!(entry = %name, error = %err, "Skipping entry");
                    None
                }
            }
        })
        .collect();

    record(&set, context);
    debug!(count = set.len(), active, "Decoded experiments");
    set
}

/// Decode the features whose `isActive` flag equals `active`.
///
/// A missing, `null` or `"<null>"` values entry yields a feature without
/// values. Entries carrying a cohort are experiments and are skipped.
pub fn features_from_json(json: &Value, context: &EntityContext, active: bool) -> EntitySet<Feature> {
    let set: EntitySet<Feature> = entries(json, active)
        .filter_map(|(name, entry)| {
            let values = match entry.get(keys::VALUES) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if s == NULL_PLACEHOLDER => None,
                Some(Value::Object(values)) => Some(values.clone()),
                Some(_) => {
                    trace!(entry = %name, "Skipping entry with malformed values");
                    return None;
                }
            };
            Feature::new(name.as_str(), values, context).ok()
        })
        .collect();

    record(&set, context);
    debug!(count = set.len(), active, "Decoded features");
    set
}

/// Object entries whose `isActive` is a boolean equal to `active`.
fn entries(json: &Value, active: bool) -> impl Iterator<Item = (&String, &Values)> {
    json.as_object()
        .into_iter()
        .flatten()
        .filter_map(move |(name, entry)| {
            let entry = entry.as_object()?;
            let is_active = entry.get(keys::IS_ACTIVE)?.as_bool()?;
            (is_active == active).then_some((name, entry))
        })
}

fn available_cohorts(entry: &Values) -> Option<Vec<String>> {
    let cohorts = entry.get(keys::AVAILABLE_COHORTS)?.as_array()?;
    Some(
        cohorts
            .iter()
            .filter_map(|c| c.as_str().map(str::to_string))
            .collect(),
    )
}

fn record<E: Entity>(set: &EntitySet<E>, context: &EntityContext) {
    if let Some(history) = context.history() {
        E::record_all(set, history.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::EntityHistory;
    use crate::snapshot::{ExperimentSnapshot, FeatureSnapshot};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    /// Batch sizes handed to the history, one entry per call.
    #[derive(Default)]
    struct BatchHistory {
        experiment_batches: Mutex<Vec<usize>>,
        feature_batches: Mutex<Vec<usize>>,
    }

    impl EntityHistory for BatchHistory {
        fn record_experiments(&self, experiments: &[ExperimentSnapshot]) {
            self.experiment_batches.lock().push(experiments.len());
        }

        fn record_features(&self, features: &[FeatureSnapshot]) {
            self.feature_batches.lock().push(features.len());
        }
    }

    #[test]
    fn test_decoded_set_recorded_in_one_batch() {
        let history = Arc::new(BatchHistory::default());
        let ctx = EntityContext::default().with_history(history.clone());
        let mut entries = serde_json::Map::new();
        for i in 0..50 {
            entries.insert(format!("flag{i}"), json!({"values": null, "isActive": true}));
            entries.insert(
                format!("exp{i}"),
                json!({"values": {"cohort": "A"}, "isActive": true}),
            );
        }
        let json = Value::Object(entries);

        assert_eq!(features_from_json(&json, &ctx, true).len(), 50);
        assert_eq!(experiments_from_json(&json, &ctx, true).len(), 50);
        assert!(features_from_json(&json, &ctx, false).is_empty());

        assert_eq!(*history.feature_batches.lock(), vec![50]);
        assert_eq!(*history.experiment_batches.lock(), vec![50]);
    }

    #[test]
    fn test_active_flag_selects_entries() {
        let ctx = EntityContext::default();
        let json = json!({"exp1": {"values": {"cohort": "A"}, "isActive": true}});

        let active = experiments_from_json(&json, &ctx, true);
        assert_eq!(active.len(), 1);
        assert_eq!(active.get("exp1").unwrap().cohort(), "A");

        assert!(experiments_from_json(&json, &ctx, false).is_empty());
    }

    #[test]
    fn test_discrimination_by_cohort() {
        let ctx = EntityContext::default();
        let json = json!({
            "exp": {"values": {"cohort": "A"}, "isActive": true},
            "feat": {"values": {"color": "red"}, "isActive": true},
        });

        let experiments = experiments_from_json(&json, &ctx, true);
        let features = features_from_json(&json, &ctx, true);
        assert_eq!(experiments.names().collect::<Vec<_>>(), vec!["exp"]);
        assert_eq!(features.names().collect::<Vec<_>>(), vec!["feat"]);
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let ctx = EntityContext::default();
        let json = json!({
            "no_values": {"isActive": true},
            "string_values": {"values": "oops", "isActive": true},
            "no_flag": {"values": {"cohort": "A"}},
            "string_flag": {"values": {"cohort": "A"}, "isActive": "true"},
            "not_object": 3,
            "good": {"values": {"cohort": "B"}, "isActive": true, "availableCohorts": ["A", "B"]},
        });

        let experiments = experiments_from_json(&json, &ctx, true);
        assert_eq!(experiments.len(), 1);
        assert_eq!(
            experiments.get("good").unwrap().available_cohorts(),
            &["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn test_feature_null_values() {
        let ctx = EntityContext::default();
        let json = json!({
            "missing": {"isActive": false},
            "null": {"values": null, "isActive": false},
            "placeholder": {"values": "<null>", "isActive": false},
            "number": {"values": 1, "isActive": false},
        });

        let features = features_from_json(&json, &ctx, false);
        assert_eq!(
            features.names().collect::<Vec<_>>(),
            vec!["missing", "null", "placeholder"]
        );
        assert!(features.iter().all(|f| f.values().is_none()));
    }

    #[test]
    fn test_non_object_configuration_is_empty() {
        let ctx = EntityContext::default();
        assert!(features_from_json(&json!([1, 2]), &ctx, true).is_empty());
    }
}
