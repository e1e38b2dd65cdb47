//! Error types for switchboard-storage.

use thiserror::Error;

/// Storage error types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No cache directory could be determined for this platform.
    #[error("Could not determine cache directory")]
    CacheDirNotFound,

    /// A cache file was written by an incompatible version.
    #[error("Unsupported cache version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
