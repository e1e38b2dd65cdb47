//! Well-known keys used in the configuration JSON and the state store.

/// Durable flag set once an experiment has been started.
pub const IS_STARTED: &str = "isStarted";
/// Durable flag set once an experiment has been completed.
pub const IS_COMPLETED: &str = "isCompleted";
/// Durable flag marking the registry as running from the debug cache.
pub const IS_DEBUGGING: &str = "isDebugging";

/// Whether an entry of the configuration JSON is active.
pub const IS_ACTIVE: &str = "isActive";
/// Cohort assignment inside an experiment's `values`.
pub const COHORT: &str = "cohort";
/// Associated values of an entry.
pub const VALUES: &str = "values";
/// Analytics opt-out flag inside `values`.
pub const DISABLE_ANALYTICS: &str = "disable_analytics";
/// Cohorts selectable for an experiment.
pub const AVAILABLE_COHORTS: &str = "availableCohorts";

/// Cohort reported when an experiment somehow lost its cohort.
pub const NO_COHORT_GIVEN: &str = "no-cohort-given";
/// Cohort used when a catalog entry lists no cohorts.
pub const DEFAULT_COHORT: &str = "control";

/// Pseudo-entity under which registry-wide flags are stored.
pub const REGISTRY_ENTITY: &str = "switchboard";
