//! Configuration client reading a JSON file from disk.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use switchboard_core::{ClientError, ConfigurationClient, Values};

/// Serves the same configuration file for every request.
#[derive(Debug, Clone)]
pub struct FileClient {
    path: PathBuf,
}

impl FileClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigurationClient for FileClient {
    fn download_configuration(
        &self,
        uuid: &str,
        user_data: Option<&Values>,
    ) -> Result<Value, ClientError> {
        debug!(
            path = %self.path.display(),
            uuid = %uuid,
            properties = user_data.map_or(0, Values::len),
            "Reading configuration file"
        );
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ClientError::Download(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| ClientError::InvalidPayload(e.to_string()))
    }
}
