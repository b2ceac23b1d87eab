//! Error types for the document model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating, editing or decoding documents.
#[derive(Debug, Error)]
pub enum ModelError {
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload was written by a newer release.
    #[error("unsupported schema version {found} (this build understands up to {current})")]
    UnsupportedVersion {
        /// Version found in the payload.
        found: u32,
        /// Newest version this build understands.
        current: u32,
    },

    /// No migration is registered for a required version step.
    #[error("no migration registered to reach schema version {0}")]
    MissingMigration(u32),

    /// A migration step rejected the payload.
    #[error("migration to version {version} failed: {reason}")]
    MigrationFailed {
        /// Target version of the failing step.
        version: u32,
        /// Why the step failed.
        reason: String,
    },

    /// A migration with the same target version is already registered.
    #[error("migration to version {0} already registered")]
    DuplicateMigration(u32),

    /// A serialized tree violates a structural rule.
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    /// No node exists at the path.
    #[error("no node at path {0}")]
    NotFound(String),

    /// A node already exists at the path.
    #[error("a node already exists at {0}")]
    AlreadyExists(String),

    /// The operation needs a folder.
    #[error("{0} is not a folder")]
    NotAFolder(String),

    /// The operation needs a file.
    #[error("{0} is not a file")]
    NotAFile(String),

    /// A node name is empty or contains a path separator.
    #[error("invalid node name: {0:?}")]
    InvalidName(String),
}
