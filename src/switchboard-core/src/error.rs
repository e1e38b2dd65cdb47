//! Error types for switchboard-core.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons an entity could not be constructed or modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Experiment values lack a string `cohort`.
    #[error("Experiment '{0}' must have a string cohort in its values")]
    MissingCohort(String),

    /// Feature values carry a `cohort`, which makes them an experiment.
    #[error("Feature '{0}' cannot have a cohort in its values")]
    UnexpectedCohort(String),

    /// An experiment was asked to depend on itself.
    #[error("Experiment '{0}' cannot depend on itself")]
    SelfDependency(String),

    /// No experiment with this name is registered.
    #[error("No experiment named '{0}'")]
    UnknownExperiment(String),

    /// Adding the dependency would close a cycle.
    #[error("Adding dependency '{dependency}' to '{experiment}' would create a cycle")]
    DependencyCycle {
        experiment: String,
        dependency: String,
    },
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading or writing the config file.
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized.
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Errors surfaced by a [`crate::ConfigurationClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configuration could not be fetched.
    #[error("Failed to download configuration: {0}")]
    Download(String),

    /// The payload was not a JSON object.
    #[error("Invalid configuration payload: {0}")]
    InvalidPayload(String),
}

/// Result type for entity construction.
pub type Result<T> = std::result::Result<T, EntityError>;
