//! Local cache of synchronized documents.

use crate::backend::KeyValueStore;
use crate::error::StoreResult;
use crate::key::StoreKey;
use std::sync::Arc;

/// Last known serialized value of every document, keyed by [`StoreKey`].
///
/// Values are opaque text (schema envelopes). Reads fall back to the legacy
/// unscoped key so caches written before per-owner keys still load.
#[derive(Clone)]
pub struct LocalCache {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalCache {
    /// Creates a cache over the given backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Reads the cached value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn get(&self, key: &StoreKey) -> StoreResult<Option<String>> {
        if let Some(value) = self.backend.get(&key.to_string())? {
            return Ok(Some(value));
        }
        let legacy = self.backend.get(&key.legacy())?;
        if legacy.is_some() {
            tracing::debug!(key = %key, "Loaded document from legacy cache key");
        }
        Ok(legacy)
    }

    /// Writes the cached value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be stored.
    pub fn set(&self, key: &StoreKey, value: &str) -> StoreResult<()> {
        self.backend.set(&key.to_string(), value)
    }

    /// Drops the cached value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    pub fn remove(&self, key: &StoreKey) -> StoreResult<()> {
        self.backend.remove(&key.to_string())
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[test]
    fn scoped_value_wins_over_legacy() {
        let store = InMemoryStore::with_entries([("settings", "old"), ("settings_me", "new")]);
        let cache = LocalCache::new(Arc::new(store));
        let key = StoreKey::owned("settings", Some("me"));
        assert_eq!(cache.get(&key).unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn legacy_value_is_read_when_scoped_missing() {
        let store = InMemoryStore::with_entries([("settings", "old")]);
        let cache = LocalCache::new(Arc::new(store));
        let key = StoreKey::owned("settings", Some("me"));
        assert_eq!(cache.get(&key).unwrap().as_deref(), Some("old"));
    }

    #[test]
    fn set_writes_scoped_key_only() {
        let store = Arc::new(InMemoryStore::new());
        let cache = LocalCache::new(store.clone());
        cache.set(&StoreKey::owned("sdks", Some("me")), "[]").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["sdks_me"]);
    }
}
