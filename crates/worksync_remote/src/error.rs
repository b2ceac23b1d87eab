//! Remote store errors.

use thiserror::Error;

/// Result type for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a [`crate::RemoteStore`].
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The store could not be reached.
    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    /// Credentials were missing, expired or refused.
    #[error("remote store rejected credentials")]
    Unauthenticated,

    /// No object with the id exists.
    #[error("remote object not found: {0}")]
    NotFound(String),

    /// The store refused the request.
    #[error("remote {operation} failed: {reason}")]
    Rejected {
        /// Operation name.
        operation: &'static str,
        /// Reason given by the store.
        reason: String,
    },
}

impl RemoteError {
    /// Creates a rejection error.
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the store is unreachable or refused credentials.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Unauthenticated)
    }
}
