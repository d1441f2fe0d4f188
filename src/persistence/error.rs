//! Error types for storage adapters.

use thiserror::Error;

/// Errors that can occur while loading, saving or deleting annotations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing store cannot be reached (no window, quota exceeded, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data is structurally invalid
    #[error("Corrupt storage: {0}")]
    Corrupt(String),
}
