//! Observable, process-wide sync status.

use crate::session::SessionState;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use worksync_model::DocumentKind;

/// Status of one document's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStatus {
    /// Current state machine phase.
    pub phase: SessionState,
    /// A remote write is running.
    pub sync_in_progress: bool,
    /// Operations in the current or last batch.
    pub total_items: usize,
    /// Operations of that batch that have finished.
    pub completed_items: usize,
    /// When the last remote write succeeded.
    pub last_sync_at: Option<SystemTime>,
    /// Last failure, cleared by the next success.
    pub error: Option<String>,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        Self {
            phase: SessionState::Idle,
            sync_in_progress: false,
            total_items: 0,
            completed_items: 0,
            last_sync_at: None,
            error: None,
        }
    }
}

/// Process-wide sync status.
///
/// Each session writes only its own [`DocumentStatus`]; the top-level
/// fields are recomputed from them on every write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// The engine has a remote connection.
    pub connected: bool,
    /// Any document is writing remotely.
    pub sync_in_progress: bool,
    /// Sum of `total_items` over documents.
    pub total_items: usize,
    /// Sum of `completed_items` over documents.
    pub completed_items: usize,
    /// Most recent successful remote write of any document.
    pub last_sync_at: Option<SystemTime>,
    /// First document error, in document order.
    pub error: Option<String>,
    /// Per-document detail.
    pub documents: BTreeMap<DocumentKind, DocumentStatus>,
}

impl SyncStatus {
    fn recompute(&mut self) {
        let docs = self.documents.values();
        self.sync_in_progress = docs.clone().any(|d| d.sync_in_progress);
        self.total_items = docs.clone().map(|d| d.total_items).sum();
        self.completed_items = docs.clone().map(|d| d.completed_items).sum();
        self.last_sync_at = docs.clone().filter_map(|d| d.last_sync_at).max();
        self.error = docs.clone().find_map(|d| d.error.clone());
    }

    /// Status of one document, if its session has reported.
    #[must_use]
    pub fn document(&self, kind: DocumentKind) -> Option<&DocumentStatus> {
        self.documents.get(&kind)
    }
}

/// Publishes [`SyncStatus`] to any number of observers.
///
/// Subscribing returns a `watch` receiver; dropping it unsubscribes.
#[derive(Debug, Clone)]
pub struct StatusHub {
    tx: Arc<watch::Sender<SyncStatus>>,
}

impl StatusHub {
    /// Creates a hub holding the default status.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncStatus::default());
        Self { tx: Arc::new(tx) }
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// Current status.
    pub fn snapshot(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    /// Number of live subscribers.
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Records the connection flag.
    pub fn set_connected(&self, connected: bool) {
        self.tx.send_if_modified(|status| {
            let changed = status.connected != connected;
            status.connected = connected;
            changed
        });
    }

    /// Updates one document's entry and recomputes the aggregate.
    pub fn update(&self, kind: DocumentKind, f: impl FnOnce(&mut DocumentStatus)) {
        self.tx.send_modify(|status| {
            f(status.documents.entry(kind).or_default());
            status.recompute();
        });
    }
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new()
    }
}
