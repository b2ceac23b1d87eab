//! Key-value backend trait definition.

use crate::error::StoreResult;

/// A durable string key-value store.
///
/// Backends are **opaque text stores**: the engine writes JSON documents
/// into them, but backends never parse what they hold.
///
/// # Invariants
///
/// - `get` returns exactly the value of the most recent `set` for that key
/// - `set` on an existing key replaces the value (last writer wins)
/// - `remove` on a missing key is not an error
/// - Backends must be `Send + Sync`; callers are responsible for not racing
///   writes to the same key
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be made durable.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Lists every key currently stored, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be enumerated.
    fn keys(&self) -> StoreResult<Vec<String>>;
}
