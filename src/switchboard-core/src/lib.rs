//! Switchboard core: feature flags and experiments evaluated on the client.
//!
//! A configuration JSON fetched from a server is decoded into four sets held
//! by the [`Switchboard`] registry: active and inactive experiments, active
//! and inactive features. Experiments carry a cohort and a durable
//! start/complete lifecycle kept in a [`StateStore`]. The [`DebugController`]
//! moves entities between sets and snapshots them into a [`SnapshotCache`] so
//! debug overrides survive restarts.
//!
//! ```rust
//! use serde_json::json;
//! use switchboard_core::{EntityContext, Switchboard};
//!
//! let mut switchboard = Switchboard::new(EntityContext::default());
//! switchboard.load_configuration(&json!({
//!     "onboarding": {"values": {"cohort": "B"}, "isActive": true},
//!     "dark_mode": {"values": null, "isActive": true},
//! }));
//!
//! assert!(switchboard.is_in("onboarding", false));
//! assert!(switchboard.is_enabled("dark_mode", false));
//! assert_eq!(switchboard.experiment("onboarding").unwrap().cohort(), "B");
//! ```

pub mod analytics;
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod controller;
pub mod edit;
pub mod entity;
pub mod error;
pub mod experiment;
pub mod factory;
pub mod feature;
pub mod gate;
pub mod history;
pub mod keys;
pub mod logging;
pub mod properties;
pub mod registry;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod transformer;

pub use analytics::{AnalyticsProvider, TracingAnalytics};
pub use cache::{ACTIVE_NAMESPACE, INACTIVE_NAMESPACE, MemorySnapshotCache, SnapshotCache};
pub use client::ConfigurationClient;
pub use config::{CohortCatalog, SwitchboardConfig};
pub use context::EntityContext;
pub use controller::{DebugController, restore_debug_cache};
pub use edit::{ExperimentEditForm, FeatureEditForm, SaveOutcome, StateChange};
pub use entity::{Entity, EntityKind, EntityRef, EntitySet, Values};
pub use error::{ClientError, ConfigError, EntityError, Result};
pub use experiment::{Experiment, ExperimentState};
pub use factory::{experiments_from_json, features_from_json};
pub use feature::Feature;
pub use gate::{GatePredicate, Gates};
pub use history::EntityHistory;
pub use properties::{AppInfo, default_properties};
pub use registry::Switchboard;
pub use settings::{DebugSetting, EditAction, SettingsSection};
pub use snapshot::{ExperimentSnapshot, FeatureSnapshot};
pub use store::{MemoryStore, StateStore};

#[cfg(test)]
mod tests;
