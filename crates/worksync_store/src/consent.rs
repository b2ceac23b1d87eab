//! Per-owner, per-document consent to write to the remote store.

use crate::backend::KeyValueStore;
use crate::error::{StoreError, StoreResult};
use crate::key::StoreKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Whether local data may be written to the remote store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    /// Nobody has been asked yet.
    #[default]
    Unset,
    /// Remote writes are allowed.
    Enabled,
    /// Remote writes are refused until an explicit change.
    Declined,
}

impl ConsentStatus {
    /// Returns `true` if remote writes are allowed.
    #[must_use]
    pub fn allows_remote_writes(self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Returns `true` once a decision has been recorded.
    #[must_use]
    pub fn is_decided(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Enabled => write!(f, "enabled"),
            Self::Declined => write!(f, "declined"),
        }
    }
}

/// One stored consent decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    /// Composite `{kind}_{owner}` key.
    pub owner_key: String,
    /// The decision.
    pub status: ConsentStatus,
}

/// Durable consent decisions.
///
/// Absent records read as [`ConsentStatus::Unset`]. Records are only ever
/// written through [`ConsentStore::set`] and [`ConsentStore::revoke`]; the
/// store itself never changes a decision.
#[derive(Clone)]
pub struct ConsentStore {
    backend: Arc<dyn KeyValueStore>,
}

impl ConsentStore {
    /// Creates a consent store over the given backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Returns the recorded status for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if the stored record is unreadable,
    /// or a backend error if the store cannot be read.
    pub fn status(&self, key: &StoreKey) -> StoreResult<ConsentStatus> {
        let name = key.to_string();
        match self.backend.get(&name)? {
            None => Ok(ConsentStatus::Unset),
            Some(raw) => Ok(decode_record(&name, &raw)?.status),
        }
    }

    /// Records a decision for `key`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    pub fn set(&self, key: &StoreKey, status: ConsentStatus) -> StoreResult<()> {
        let record = ConsentRecord {
            owner_key: key.to_string(),
            status,
        };
        let raw = serde_json::to_string(&record).map_err(|e| StoreError::Corrupted {
            key: record.owner_key.clone(),
            reason: e.to_string(),
        })?;
        self.backend.set(&record.owner_key, &raw)?;
        tracing::debug!(key = %key, status = %status, "Consent recorded");
        Ok(())
    }

    /// Forgets the decision for `key`; the next read yields `Unset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    pub fn revoke(&self, key: &StoreKey) -> StoreResult<()> {
        self.backend.remove(&key.to_string())
    }

    /// Every stored record, ordered by key. Unreadable records are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be enumerated.
    pub fn records(&self) -> StoreResult<Vec<ConsentRecord>> {
        let mut records = Vec::new();
        for name in self.backend.keys()? {
            let Some(raw) = self.backend.get(&name)? else {
                continue;
            };
            match decode_record(&name, &raw) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable consent record"),
            }
        }
        Ok(records)
    }
}

impl fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentStore").finish_non_exhaustive()
    }
}

fn decode_record(name: &str, raw: &str) -> StoreResult<ConsentRecord> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupted {
        key: name.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn store() -> (Arc<InMemoryStore>, ConsentStore) {
        let backend = Arc::new(InMemoryStore::new());
        (backend.clone(), ConsentStore::new(backend))
    }

    #[test]
    fn absent_record_is_unset() {
        let (_, consent) = store();
        let key = StoreKey::owned("workspace", Some("a@b.c"));
        assert_eq!(consent.status(&key).unwrap(), ConsentStatus::Unset);
    }

    #[test]
    fn decision_is_scoped_per_owner() {
        let (_, consent) = store();
        let alice = StoreKey::owned("workspace", Some("alice"));
        let bob = StoreKey::owned("workspace", Some("bob"));
        consent.set(&alice, ConsentStatus::Declined).unwrap();
        assert_eq!(consent.status(&alice).unwrap(), ConsentStatus::Declined);
        assert_eq!(consent.status(&bob).unwrap(), ConsentStatus::Unset);
    }

    #[test]
    fn revoke_returns_to_unset() {
        let (_, consent) = store();
        let key = StoreKey::unowned("settings");
        consent.set(&key, ConsentStatus::Enabled).unwrap();
        consent.revoke(&key).unwrap();
        assert_eq!(consent.status(&key).unwrap(), ConsentStatus::Unset);
    }

    #[test]
    fn record_is_stored_as_json() {
        let (backend, consent) = store();
        consent
            .set(&StoreKey::owned("sdks", Some("me")), ConsentStatus::Enabled)
            .unwrap();
        let raw = backend.get("sdks_me").unwrap().unwrap();
        assert_eq!(raw, r#"{"ownerKey":"sdks_me","status":"enabled"}"#);
    }

    #[test]
    fn corrupted_record_is_reported() {
        let backend = Arc::new(InMemoryStore::with_entries([("settings_default", "yes")]));
        let consent = ConsentStore::new(backend);
        let err = consent.status(&StoreKey::unowned("settings")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));
        assert!(consent.records().unwrap().is_empty());
    }

    #[test]
    fn records_lists_decisions() {
        let (_, consent) = store();
        consent
            .set(&StoreKey::owned("b", None), ConsentStatus::Declined)
            .unwrap();
        consent
            .set(&StoreKey::owned("a", None), ConsentStatus::Enabled)
            .unwrap();
        let records = consent.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].owner_key, "a_default");
        assert_eq!(records[1].status, ConsentStatus::Declined);
    }

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(ConsentStatus::Declined.to_string(), "declined");
        assert!(ConsentStatus::Enabled.allows_remote_writes());
        assert!(!ConsentStatus::Unset.is_decided());
    }
}
