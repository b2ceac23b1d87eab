//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the store directory lock.
    #[error("store directory is locked by another process: {0}")]
    Locked(String),

    /// The store path is unusable (missing, or not a directory).
    #[error("invalid store path: {0}")]
    InvalidPath(String),

    /// A stored value could not be interpreted.
    #[error("store value corrupted for key {key}: {reason}")]
    Corrupted {
        /// The key whose value is unreadable.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}
