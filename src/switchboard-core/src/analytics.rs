//! Analytics sink for experiment and feature events.

use tracing::info;

use crate::entity::{EntityRef, EntitySet, Values};
use crate::experiment::Experiment;
use crate::feature::Feature;

/// Receives experiment lifecycle and custom events.
///
/// Entities only call into the provider when their values do not carry
/// `disable_analytics: true`.
pub trait AnalyticsProvider: Send + Sync {
    /// Called once a configuration has been decoded, with the active sets the
    /// person is entitled to.
    fn entitled(&self, experiments: &EntitySet<Experiment>, features: &EntitySet<Feature>);

    /// An experiment was started.
    fn track_started(&self, experiment: &Experiment);

    /// An experiment was completed.
    fn track_completed(&self, experiment: &Experiment);

    /// A custom event associated with an experiment or feature.
    fn track(&self, event: &str, entity: EntityRef<'_>, properties: Option<&Values>);
}

/// Provider that reports every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsProvider for TracingAnalytics {
    fn entitled(&self, experiments: &EntitySet<Experiment>, features: &EntitySet<Feature>) {
        info!(
            target: "switchboard::analytics",
            experiments = ?experiments.names().collect::<Vec<_>>(),
            features = ?features.names().collect::<Vec<_>>(),
            "Entitled"
        );
    }

    fn track_started(&self, experiment: &Experiment) {
        info!(
            target: "switchboard::analytics",
            experiment = %experiment.name(),
            cohort = %experiment.cohort(),
            "Experiment started"
        );
    }

    fn track_completed(&self, experiment: &Experiment) {
        info!(
            target: "switchboard::analytics",
            experiment = %experiment.name(),
            cohort = %experiment.cohort(),
            "Experiment completed"
        );
    }

    fn track(&self, event: &str, entity: EntityRef<'_>, properties: Option<&Values>) {
        info!(
            target: "switchboard::analytics",
            event = %event,
            kind = %entity.kind(),
            name = %entity.name(),
            properties = ?properties,
            "Tracked event"
        );
    }
}
