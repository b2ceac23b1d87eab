//! Remote store adapter contract.

use crate::error::RemoteResult;
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};

/// The remote store's view of one object.
///
/// Only used as a comparison set during reconciliation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Store-assigned id.
    pub id: String,
    /// Object name, unique per folder by convention only.
    pub name: String,
    /// Containing folder, `None` at the store root.
    pub parent_id: Option<String>,
    /// Hex SHA-256 of the content, when the store reports one.
    pub hash: Option<String>,
    /// Content length in bytes, when the store reports one.
    pub size: Option<u64>,
    /// Whether this is a folder.
    pub is_folder: bool,
}

/// An async remote object store.
///
/// Every call may fail and may be retried by the caller; implementations
/// must not retry internally. Calls must be safe to issue concurrently.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Finds the folder `name` under `parent` (the store root when `None`),
    /// creating it if missing. Idempotent.
    async fn resolve_folder(&self, parent: Option<&str>, name: &str) -> RemoteResult<String>;

    /// Lists the direct children of a folder.
    async fn list(&self, folder: &str) -> RemoteResult<Vec<RemoteEntry>>;

    /// Reads an object's content.
    async fn read_bytes(&self, id: &str) -> RemoteResult<Bytes>;

    /// Creates an object and returns its id.
    async fn create_file(
        &self,
        folder: &str,
        name: &str,
        bytes: Bytes,
        mime_type: &str,
    ) -> RemoteResult<String>;

    /// Replaces an object's content. Returns `false` if the id is unknown.
    async fn update_file(&self, id: &str, bytes: Bytes) -> RemoteResult<bool>;

    /// Deletes an object. Returns `false` if the id is unknown.
    async fn delete_file(&self, id: &str) -> RemoteResult<bool>;
}

/// Hex SHA-256, the hash format [`RemoteEntry::hash`] is compared against.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
