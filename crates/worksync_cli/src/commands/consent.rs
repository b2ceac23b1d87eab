//! Consent command implementation.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use worksync_model::DocumentKind;
use worksync_store::{ConsentStatus, ConsentStore, FileStore, StoreKey};

/// Consent state of one document kind.
#[derive(Debug, Serialize)]
pub struct ConsentReport {
    /// Store key of the record.
    pub key: String,
    /// Document kind.
    pub kind: String,
    /// Current status.
    pub status: ConsentStatus,
}

/// Runs the consent command: shows, and optionally changes, the decision of
/// every requested document kind for `owner`.
pub fn run(
    path: &Path,
    kind: Option<&str>,
    owner: Option<&str>,
    set: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ConsentStore::new(Arc::new(FileStore::open(path)?));
    let kinds = match kind {
        Some(kind) => vec![kind.parse::<DocumentKind>()?],
        None => DocumentKind::ALL.to_vec(),
    };
    let set = set.map(parse_status).transpose()?;

    for report in apply(&store, &kinds, owner, set)? {
        println!("{}: {}", report.key, report.status);
    }
    Ok(())
}

/// Applies `set` (if any) to each kind and reports the resulting status.
pub fn apply(
    store: &ConsentStore,
    kinds: &[DocumentKind],
    owner: Option<&str>,
    set: Option<ConsentStatus>,
) -> Result<Vec<ConsentReport>, Box<dyn std::error::Error>> {
    let mut reports = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let key = StoreKey::owned(kind.consent_prefix(), owner);
        match set {
            Some(ConsentStatus::Unset) => store.revoke(&key)?,
            Some(status) => store.set(&key, status)?,
            None => {}
        }
        reports.push(ConsentReport {
            key: key.to_string(),
            kind: kind.to_string(),
            status: store.status(&key)?,
        });
    }
    Ok(reports)
}

fn parse_status(s: &str) -> Result<ConsentStatus, String> {
    match s {
        "enabled" => Ok(ConsentStatus::Enabled),
        "declined" => Ok(ConsentStatus::Declined),
        "unset" => Ok(ConsentStatus::Unset),
        other => Err(format!("unknown consent status: {other}")),
    }
}
