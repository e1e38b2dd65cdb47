//! Gating predicates that force experiments or features to read as absent.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Predicate over an experiment or feature name. Returning `true` prevents it.
pub type GatePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Default)]
struct GateSet {
    experiment: Option<GatePredicate>,
    feature: Option<GatePredicate>,
}

/// Shared handle to the registry's gating predicates.
///
/// The registry and every experiment it creates hold clones of the same
/// handle, so a predicate installed later is seen by existing experiments.
#[derive(Clone, Default)]
pub struct Gates {
    inner: Arc<RwLock<GateSet>>,
}

impl Gates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_experiment_gate<F>(&self, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.inner.write().experiment = Some(Arc::new(predicate));
    }

    pub fn set_feature_gate<F>(&self, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.inner.write().feature = Some(Arc::new(predicate));
    }

    pub fn clear_experiment_gate(&self) {
        self.inner.write().experiment = None;
    }

    pub fn clear_feature_gate(&self) {
        self.inner.write().feature = None;
    }

    /// Whether the experiment is prevented from starting or being reported.
    pub fn prevents_experiment(&self, name: &str) -> bool {
        // Clone out of the lock so the predicate never runs under it.
        let predicate = self.inner.read().experiment.clone();
        predicate.is_some_and(|p| p(name))
    }

    /// Whether the feature is prevented from being reported as enabled.
    pub fn prevents_feature(&self, name: &str) -> bool {
        let predicate = self.inner.read().feature.clone();
        predicate.is_some_and(|p| p(name))
    }
}

impl fmt::Debug for Gates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gates = self.inner.read();
        f.debug_struct("Gates")
            .field("experiment", &gates.experiment.is_some())
            .field("feature", &gates.feature.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_gate_prevents_nothing() {
        let gates = Gates::new();
        assert!(!gates.prevents_experiment("exp"));
        assert!(!gates.prevents_feature("feat"));
    }

    #[test]
    fn test_gate_shared_between_clones() {
        let gates = Gates::new();
        let handle = gates.clone();
        gates.set_experiment_gate(|name| name == "blocked");

        assert!(handle.prevents_experiment("blocked"));
        assert!(!handle.prevents_experiment("open"));
        assert!(!handle.prevents_feature("blocked"));

        gates.clear_experiment_gate();
        assert!(!handle.prevents_experiment("blocked"));
    }
}
