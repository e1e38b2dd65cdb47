//! Switchboard configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keys;
use crate::store::DEFAULT_NAMESPACE;

/// Table read from the configuration file.
pub const CONFIG_TABLE: &str = "switchboard";

/// Configuration for a switchboard instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    /// Root for caches and the state file. Falls back to the platform cache
    /// directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Namespace prepended to state store keys.
    pub store_namespace: String,
    /// Warn about direct registry mutations in release builds.
    pub log_dangerous_calls: bool,
    /// Experiment names mapped to the cohorts debug tooling offers.
    pub cohorts: BTreeMap<String, Vec<String>>,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            store_namespace: DEFAULT_NAMESPACE.to_string(),
            log_dangerous_calls: true,
            cohorts: BTreeMap::new(),
        }
    }
}

impl SwitchboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file, reading the `[switchboard]` table.
    ///
    /// A file without the table yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut table: toml::Table = content.parse()?;
        match table.remove(CONFIG_TABLE) {
            Some(section) => Ok(section.try_into()?),
            None => Ok(Self::default()),
        }
    }

    /// Save to a TOML file under the `[switchboard]` table.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut table = toml::Table::new();
        table.insert(CONFIG_TABLE.to_string(), toml::Value::try_from(self)?);
        let content = toml::to_string_pretty(&table)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn cohort_catalog(&self) -> CohortCatalog {
        CohortCatalog::new(self.cohorts.clone())
    }
}

/// Cohorts offered for known experiment names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortCatalog {
    entries: BTreeMap<String, Vec<String>>,
}

impl CohortCatalog {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, experiment: impl Into<String>, cohorts: Vec<String>) {
        self.entries.insert(experiment.into(), cohorts);
    }

    pub fn cohorts(&self, experiment: &str) -> &[String] {
        self.entries.get(experiment).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cohort assigned to an experiment created from the catalog: the first
    /// listed, or `control` when none are.
    pub fn default_cohort(&self, experiment: &str) -> &str {
        self.cohorts(experiment)
            .first()
            .map(String::as_str)
            .unwrap_or(keys::DEFAULT_COHORT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, cohorts)| (name.as_str(), cohorts.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_is_default() {
        let config = SwitchboardConfig::from_toml_str("[other]\nkey = 1\n").unwrap();
        assert_eq!(config, SwitchboardConfig::default());
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config = SwitchboardConfig::from_toml_str(
            "[switchboard]\nlog_dangerous_calls = false\n\n[switchboard.cohorts]\nonboarding = [\"a\", \"b\"]\n",
        )
        .unwrap();

        assert!(!config.log_dangerous_calls);
        assert_eq!(config.store_namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.cohort_catalog().cohorts("onboarding"), ["a", "b"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchboard.toml");

        let mut config = SwitchboardConfig::new();
        config.data_dir = Some(dir.path().to_path_buf());
        config.cohorts.insert("exp".to_string(), vec!["x".to_string()]);
        config.save(&path).unwrap();

        assert_eq!(SwitchboardConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            SwitchboardConfig::from_toml_str("[switchboard"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_catalog_default_cohort() {
        let mut catalog = CohortCatalog::default();
        catalog.insert("listed", vec!["b".to_string(), "a".to_string()]);
        catalog.insert("empty", Vec::new());

        assert_eq!(catalog.default_cohort("listed"), "b");
        assert_eq!(catalog.default_cohort("empty"), "control");
        assert_eq!(catalog.default_cohort("unknown"), "control");
    }
}
