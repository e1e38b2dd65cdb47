//! Versioned JSON snapshot cache.
//!
//! Each set is stored on its own under `<domain>[/<namespace>]/`:
//!
//! ```text
//! debug/active/experiments.json
//! debug/active/features.json
//! prefill/experiments.json
//! ```
//!
//! Files hold `{"version": 1, "entries": [...]}`. A file from another version
//! or one that fails to decode restores as nothing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use switchboard_core::cache::Restored;
use switchboard_core::{ExperimentSnapshot, FeatureSnapshot, SnapshotCache};

use crate::error::{Result, StorageError};
use crate::medium::{CacheMedium, FileMedium};
use crate::paths::{DEBUG_DIR, PREFILL_DIR, SwitchboardPaths};

/// Current cache file version.
pub const CACHE_VERSION: u32 = 1;

const EXPERIMENTS_FILE: &str = "experiments.json";
const FEATURES_FILE: &str = "features.json";

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    entries: &'a [T],
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    entries: Value,
}

/// Snapshot cache rooted at a domain of a [`CacheMedium`].
#[derive(Debug, Clone)]
pub struct EntityCache<M> {
    medium: M,
    domain: String,
}

impl<M: CacheMedium> EntityCache<M> {
    pub fn new(medium: M, domain: impl Into<String>) -> Self {
        Self {
            medium,
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn dir(&self, namespace: Option<&str>) -> String {
        match namespace {
            Some(namespace) => format!("{}/{}", self.domain, namespace),
            None => self.domain.clone(),
        }
    }

    fn key(&self, namespace: Option<&str>, file: &str) -> String {
        format!("{}/{}", self.dir(namespace), file)
    }

    fn store<T: Serialize>(&self, key: &str, entries: &[T]) -> Result<()> {
        let envelope = EnvelopeRef {
            version: CACHE_VERSION,
            entries,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        self.medium.write(key, &bytes)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let Some(bytes) = self.medium.read(key)? else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if envelope.version != CACHE_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: envelope.version,
                expected: CACHE_VERSION,
            });
        }
        Ok(Some(serde_json::from_value(envelope.entries)?))
    }

    fn load_or_warn<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        match self.load(key) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(key = %key, error = %err, "Discarding unreadable cache file");
                None
            }
        }
    }
}

impl EntityCache<FileMedium> {
    /// Debug cache holding the active and inactive snapshots.
    pub fn debug(paths: &SwitchboardPaths) -> Self {
        Self::new(FileMedium::new(&paths.root), DEBUG_DIR)
    }

    /// Long-lived history of previously seen entities.
    pub fn prefill(paths: &SwitchboardPaths) -> Self {
        Self::new(FileMedium::new(&paths.root), PREFILL_DIR)
    }
}

impl<M: CacheMedium> SnapshotCache for EntityCache<M> {
    fn cache(
        &self,
        experiments: &[ExperimentSnapshot],
        features: &[FeatureSnapshot],
        namespace: Option<&str>,
    ) {
        let experiments_key = self.key(namespace, EXPERIMENTS_FILE);
        if let Err(err) = self.store(&experiments_key, experiments) {
            warn!(key = %experiments_key, error = %err, "Failed to cache experiments");
        }
        let features_key = self.key(namespace, FEATURES_FILE);
        if let Err(err) = self.store(&features_key, features) {
            warn!(key = %features_key, error = %err, "Failed to cache features");
        }
        debug!(
            domain = %self.domain,
            namespace = ?namespace,
            experiments = experiments.len(),
            features = features.len(),
            "Cached snapshots"
        );
    }

    fn restore(&self, namespace: Option<&str>) -> Restored {
        (
            self.load_or_warn(&self.key(namespace, EXPERIMENTS_FILE)),
            self.load_or_warn(&self.key(namespace, FEATURES_FILE)),
        )
    }

    fn clear(&self, namespace: Option<&str>) {
        for file in [EXPERIMENTS_FILE, FEATURES_FILE] {
            let key = self.key(namespace, file);
            if let Err(err) = self.medium.remove(&key) {
                warn!(key = %key, error = %err, "Failed to clear cache file");
            }
        }
    }
}
