//! Explicit collaborator context shared by the registry and its entities.

use std::fmt;
use std::sync::Arc;

use crate::analytics::AnalyticsProvider;
use crate::gate::Gates;
use crate::history::EntityHistory;
use crate::store::{MemoryStore, StateStore};

/// Collaborators handed to every entity at construction.
///
/// Built once at application start and passed to the [`crate::Switchboard`],
/// the factory and any code that creates experiments or features.
#[derive(Clone)]
pub struct EntityContext {
    store: Arc<dyn StateStore>,
    analytics: Option<Arc<dyn AnalyticsProvider>>,
    history: Option<Arc<dyn EntityHistory>>,
    gates: Gates,
    log_dangerous_calls: bool,
}

impl EntityContext {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            analytics: None,
            history: None,
            gates: Gates::new(),
            log_dangerous_calls: true,
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsProvider>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn EntityHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_gates(mut self, gates: Gates) -> Self {
        self.gates = gates;
        self
    }

    /// Enable or disable dangerous-call warnings in release builds.
    pub fn with_dangerous_call_logging(mut self, enabled: bool) -> Self {
        self.log_dangerous_calls = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn analytics(&self) -> Option<&Arc<dyn AnalyticsProvider>> {
        self.analytics.as_ref()
    }

    pub fn history(&self) -> Option<&Arc<dyn EntityHistory>> {
        self.history.as_ref()
    }

    pub fn gates(&self) -> &Gates {
        &self.gates
    }

    pub fn log_dangerous_calls(&self) -> bool {
        self.log_dangerous_calls
    }
}

impl Default for EntityContext {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl fmt::Debug for EntityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityContext")
            .field("namespace", &self.store.namespace())
            .field("analytics", &self.analytics.is_some())
            .field("history", &self.history.is_some())
            .field("gates", &self.gates)
            .field("log_dangerous_calls", &self.log_dangerous_calls)
            .finish()
    }
}
