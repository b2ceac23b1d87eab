//! Error types for the sync engine.

use thiserror::Error;
use worksync_model::ModelError;
use worksync_remote::RemoteError;
use worksync_store::StoreError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// None of these escape `mutate`; they are recorded in the shared
/// [`crate::SyncStatus`] and returned from the explicit entry points.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote store is unreachable or refused credentials.
    #[error("remote store unavailable: {0}")]
    Connectivity(String),

    /// A remote blob did not parse.
    #[error("malformed remote data for {document}: {reason}")]
    MalformedRemoteData {
        /// Document kind.
        document: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Some operations of a diff batch failed; the rest were applied.
    #[error("{} of the batch failed: {}", failed.len(), failed.join(", "))]
    PartialBatchFailure {
        /// Names whose operation failed.
        failed: Vec<String>,
    },

    /// Local store error.
    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    /// Document model error.
    #[error("document error: {0}")]
    Model(#[from] ModelError),

    /// Remote store error other than connectivity.
    #[error("remote error: {0}")]
    Remote(RemoteError),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        if err.is_connectivity() {
            Self::Connectivity(err.to_string())
        } else {
            Self::Remote(err)
        }
    }
}

impl SyncError {
    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Connectivity(_) => true,
            SyncError::PartialBatchFailure { .. } => true,
            SyncError::Remote(RemoteError::Rejected { .. }) => true,
            _ => false,
        }
    }
}
