//! Byte-level persistence under relative keys.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::Result;

/// Durable byte storage addressed by `/`-separated relative keys.
pub trait CacheMedium: Send + Sync {
    /// Read a key. A missing key reads as `None`.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Remove a key and anything stored below it.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Medium backed by files under a root directory.
#[derive(Debug, Clone)]
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl CacheMedium for FileMedium {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        write_atomic(&self.path(key), data)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Write through a temporary sibling and rename it into place, syncing the
/// file and its directory.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{}.tmp", file_name));

    let file = std::fs::File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(data)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    std::fs::rename(&tmp_path, path)?;

    #[cfg(unix)]
    {
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    trace!(path = %path.display(), bytes = data.len(), "Wrote file");
    Ok(())
}
