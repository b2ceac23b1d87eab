//! In-memory key-value backend for testing.

use crate::backend::KeyValueStore;
use crate::error::StoreResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory key-value backend.
///
/// This backend keeps every value in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Sessions that don't need to survive a restart
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use worksync_store::{InMemoryStore, KeyValueStore};
///
/// let store = InMemoryStore::new();
/// store.set("workspace_default", "{}").unwrap();
/// assert_eq!(store.get("workspace_default").unwrap().as_deref(), Some("{}"));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing entries.
    ///
    /// Useful for simulating a cache left behind by an earlier session.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Returns a copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_get_missing_returns_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("nothing").unwrap(), None);
    }

    #[test]
    fn memory_set_replaces_value() {
        let store = InMemoryStore::new();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_remove_missing_is_ok() {
        let store = InMemoryStore::new();
        store.remove("ghost").unwrap();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn memory_keys_are_sorted() {
        let store = InMemoryStore::with_entries([("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(store.keys().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryStore::with_entries([("a", "1")]);
        store.clear();
        assert!(store.is_empty());
    }
}
