//! Long-lived history of previously seen entities.

use crate::snapshot::{ExperimentSnapshot, FeatureSnapshot};

/// Sink recording every entity the registry or factory has seen, so debug
/// tooling can offer to re-create it later.
pub trait EntityHistory: Send + Sync {
    fn record_experiments(&self, experiments: &[ExperimentSnapshot]);

    fn record_features(&self, features: &[FeatureSnapshot]);
}
