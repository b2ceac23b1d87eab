//! Per-document synchronization session.
//!
//! A session owns one document's in-memory value and runs the
//! hydrate/debounce/persist state machine:
//!
//! ```text
//! Hydrating -> Idle <-> Dirty -> Persisting -> Idle
//!                                    \-> Dirty (value changed mid-write)
//! any -> Disconnected -> Hydrating (on reconnect)
//! ```
//!
//! Persists of one session are serialized by an async lock. A debounce
//! timer is the only thing a mutation cancels; a write that has started
//! always runs to completion.

use crate::diff::DiffSynchronizer;
use crate::engine::EngineContext;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use worksync_model::{Document, DocumentKind, Fingerprint, ModelResult, JSON_MIME};
use worksync_remote::{read_named, upsert_named};
use worksync_store::{ConsentStatus, StoreKey};

/// Phase of a session's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Loading the value from the remote store or the local cache.
    Hydrating,
    /// The value is persisted.
    Idle,
    /// The value changed and a persist is pending.
    Dirty,
    /// A persist is writing.
    Persisting,
    /// The engine disconnected; only the local cache is written.
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hydrating => "hydrating",
            Self::Idle => "idle",
            Self::Dirty => "dirty",
            Self::Persisting => "persisting",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Snapshot of a document and its sync bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentState<D> {
    /// Current value.
    pub value: D,
    /// The value changed since the last completed persist.
    pub dirty: bool,
    /// Fingerprint of the last value written remotely.
    pub last_persisted: Option<Fingerprint>,
    /// A hydrate has completed since the last disconnect.
    pub hydrated: bool,
}

/// Where a hydrated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateSource {
    /// The remote store held a parseable value.
    Remote,
    /// The local cache held a value.
    Local,
    /// Nothing was stored; the built-in default was used.
    Default,
}

struct Core<D> {
    value: D,
    phase: SessionState,
    dirty: bool,
    last_persisted: Option<Fingerprint>,
    hydrated: bool,
    generation: u64,
    failures: u32,
}

struct Inner<D: Document> {
    ctx: Arc<EngineContext>,
    core: Mutex<Core<D>>,
    persist_lock: tokio::sync::Mutex<()>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<D: Document> Drop for Inner<D> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}

/// Synchronizes one document between memory, the local cache and the
/// remote store.
///
/// Cloning is cheap; clones share the same session.
pub struct DocumentSyncSession<D: Document> {
    inner: Arc<Inner<D>>,
}

impl<D: Document> Clone for DocumentSyncSession<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Document> DocumentSyncSession<D> {
    pub(crate) fn new(ctx: Arc<EngineContext>) -> Self {
        let session = Self {
            inner: Arc::new(Inner {
                ctx,
                core: Mutex::new(Core {
                    value: D::default_value(),
                    phase: SessionState::Hydrating,
                    dirty: false,
                    last_persisted: None,
                    hydrated: false,
                    generation: 0,
                    failures: 0,
                }),
                persist_lock: tokio::sync::Mutex::new(()),
                timer: Mutex::new(None),
            }),
        };
        session.publish(|d| d.phase = SessionState::Hydrating);
        session
    }

    /// Document kind of this session.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        D::KIND
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> D {
        self.inner.core.lock().value.clone()
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().phase
    }

    /// Value and bookkeeping, read atomically.
    #[must_use]
    pub fn document_state(&self) -> DocumentState<D> {
        let core = self.inner.core.lock();
        DocumentState {
            value: core.value.clone(),
            dirty: core.dirty,
            last_persisted: core.last_persisted,
            hydrated: core.hydrated,
        }
    }

    /// Loads the document.
    ///
    /// An edit still waiting for its debounce wins over everything: it is
    /// saved to the local cache first and stays dirty. Otherwise a
    /// parseable remote value wins over the local cache and implicitly
    /// enables consent if it was never decided. Otherwise the cached value,
    /// or the default, is used, and the user is asked for consent if the
    /// cached value holds data and consent is unset. Whatever wins is
    /// written back to the local cache.
    ///
    /// Failures never escape; they are recorded in the sync status.
    pub async fn hydrate(&self) -> HydrateSource {
        let ctx = &self.inner.ctx;
        let _guard = self.inner.persist_lock.lock().await;
        self.cancel_timer();

        let (generation, pending) = {
            let mut core = self.inner.core.lock();
            core.phase = SessionState::Hydrating;
            (core.generation, core.dirty.then(|| core.value.clone()))
        };
        self.publish(|d| d.phase = SessionState::Hydrating);

        let connection = ctx.connection();
        let key = ctx.store_key(D::KIND, connection.owner.as_deref());
        let consent_key = ctx.consent_key(D::KIND, connection.owner.as_deref());
        if let Some(value) = &pending {
            self.write_cache(&key, value);
        }
        let local = self.read_cache(&key);

        let remote = if connection.connected {
            self.read_remote().await
        } else {
            Err(SyncError::Connectivity("not connected".to_string()))
        };

        let reachable = match &remote {
            Ok(_) => true,
            Err(SyncError::MalformedRemoteData { reason, .. }) => {
                tracing::warn!(document = %D::KIND, reason = %reason, "Ignoring malformed remote data");
                true
            }
            Err(err) => {
                if connection.connected {
                    tracing::warn!(document = %D::KIND, error = %err, "Remote read failed");
                    let message = err.to_string();
                    self.publish(|d| d.error = Some(message));
                }
                false
            }
        };

        let (value, source, push) = match (pending, remote) {
            (Some(value), _) => {
                tracing::debug!(document = %D::KIND, "Unsaved edit wins over stored data");
                if reachable {
                    self.settle_consent(&consent_key, &value, HydrateSource::Local, connection.owner.as_deref())
                        .await;
                }
                (value, HydrateSource::Local, true)
            }
            (None, Ok(Some(value))) => {
                if self.consent(&consent_key) == ConsentStatus::Unset {
                    self.record_consent(&consent_key, ConsentStatus::Enabled);
                }
                (value, HydrateSource::Remote, false)
            }
            (None, _) => {
                let (value, source) = match local {
                    Some(value) => (value, HydrateSource::Local),
                    None => (D::default_value(), HydrateSource::Default),
                };
                let push = reachable
                    && self.settle_consent(&consent_key, &value, source, connection.owner.as_deref()).await
                    && !value.is_empty();
                (value, source, push)
            }
        };

        let fingerprint = value.fingerprint().ok();
        {
            let mut core = self.inner.core.lock();
            core.hydrated = true;
            if core.generation != generation {
                tracing::debug!(document = %D::KIND, "Local edit during hydrate wins");
                core.phase = SessionState::Dirty;
                drop(core);
                self.publish(|d| d.phase = SessionState::Dirty);
                return source;
            }
            core.value = value.clone();
            core.failures = 0;
            if source == HydrateSource::Remote {
                core.last_persisted = fingerprint;
            }
            core.dirty = push;
            core.phase = if push {
                SessionState::Dirty
            } else {
                SessionState::Idle
            };
        }

        self.write_cache(&key, &value);
        self.publish(|d| {
            d.phase = if push {
                SessionState::Dirty
            } else {
                SessionState::Idle
            };
            if reachable {
                d.error = None;
            }
        });
        if push {
            self.schedule(ctx.config.debounce);
        }

        tracing::info!(document = %D::KIND, source = ?source, "Hydrated");
        source
    }

    /// Replaces the value, marks it dirty and restarts the debounce timer.
    pub fn mutate(&self, value: D) {
        self.modify(|current| *current = value);
    }

    /// Edits the value in place, then behaves like [`Self::mutate`].
    pub fn update(&self, f: impl FnOnce(&mut D)) {
        self.modify(f);
    }

    /// Applies a fallible edit. On error the value is left untouched and
    /// nothing is scheduled.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`.
    pub fn try_update<R>(&self, f: impl FnOnce(&mut D) -> ModelResult<R>) -> ModelResult<R> {
        let mut draft = self.value();
        let out = f(&mut draft)?;
        self.mutate(draft);
        Ok(out)
    }

    /// Persists immediately, skipping the debounce window.
    ///
    /// # Errors
    ///
    /// Returns the failure of the remote write, which is also recorded in
    /// the sync status.
    pub async fn flush(&self) -> SyncResult<()> {
        self.cancel_timer();
        self.persist().await
    }

    /// Stops remote syncing. A pending edit is saved to the local cache
    /// first.
    pub fn disconnect(&self) {
        self.cancel_timer();
        let pending = {
            let mut core = self.inner.core.lock();
            core.phase = SessionState::Disconnected;
            core.hydrated = false;
            core.failures = 0;
            if core.dirty {
                core.dirty = false;
                Some(core.value.clone())
            } else {
                None
            }
        };
        if let Some(value) = pending {
            let ctx = &self.inner.ctx;
            let key = ctx.store_key(D::KIND, ctx.connection().owner.as_deref());
            self.write_cache(&key, &value);
        }
        self.publish(|d| {
            d.phase = SessionState::Disconnected;
            d.sync_in_progress = false;
        });
    }

    fn modify(&self, f: impl FnOnce(&mut D)) {
        let phase = {
            let mut core = self.inner.core.lock();
            f(&mut core.value);
            core.dirty = true;
            core.generation += 1;
            core.failures = 0;
            if matches!(core.phase, SessionState::Idle | SessionState::Dirty) {
                core.phase = SessionState::Dirty;
            }
            core.phase
        };
        self.publish(|d| d.phase = phase);
        self.schedule(self.inner.ctx.config.debounce);
    }

    /// Writes the current value. The local cache is always written; the
    /// remote store only when the session is hydrated, the engine is
    /// connected and consent is enabled.
    async fn persist(&self) -> SyncResult<()> {
        let ctx = &self.inner.ctx;
        let _guard = self.inner.persist_lock.lock().await;

        let (value, hydrated, phase) = {
            let core = self.inner.core.lock();
            if !core.dirty {
                return Ok(());
            }
            (core.value.clone(), core.hydrated, core.phase)
        };
        let fingerprint = value.fingerprint()?;

        let connection = ctx.connection();
        let key = ctx.store_key(D::KIND, connection.owner.as_deref());
        self.write_cache(&key, &value);

        let remote = hydrated
            && connection.connected
            && phase != SessionState::Disconnected
            && self
                .consent(&ctx.consent_key(D::KIND, connection.owner.as_deref()))
                .allows_remote_writes();

        if !remote {
            tracing::debug!(document = %D::KIND, "Persisted locally only");
            let phase = self.finish(&fingerprint, false);
            self.publish(|d| d.phase = phase);
            return Ok(());
        }

        {
            let mut core = self.inner.core.lock();
            if core.phase != SessionState::Disconnected {
                core.phase = SessionState::Persisting;
            }
        }
        self.publish(|d| {
            d.phase = SessionState::Persisting;
            d.sync_in_progress = true;
        });

        match self.push(&value).await {
            Ok(()) => {
                let phase = self.finish(&fingerprint, true);
                tracing::debug!(document = %D::KIND, fingerprint = ?fingerprint, "Persisted");
                self.publish(|d| {
                    d.phase = phase;
                    d.sync_in_progress = false;
                    d.error = None;
                    d.last_sync_at = Some(SystemTime::now());
                });
                Ok(())
            }
            Err(err) => {
                let (phase, failures) = {
                    let mut core = self.inner.core.lock();
                    core.failures += 1;
                    if core.phase != SessionState::Disconnected {
                        core.phase = SessionState::Dirty;
                    }
                    (core.phase, core.failures)
                };
                let message = err.to_string();
                tracing::warn!(document = %D::KIND, error = %message, failures, "Remote persist failed");
                self.publish(|d| {
                    d.phase = phase;
                    d.sync_in_progress = false;
                    d.error = Some(message);
                });

                let retry = &ctx.config.retry;
                if phase != SessionState::Disconnected
                    && err.is_retryable()
                    && retry.allows_retry(failures)
                {
                    self.schedule(retry.delay_for_attempt(failures));
                }
                Err(err)
            }
        }
    }

    /// Settles the state after a completed write of the value with
    /// `fingerprint` and returns the new phase. The value stays dirty if it
    /// changed while the write was running.
    fn finish(&self, fingerprint: &Fingerprint, remote: bool) -> SessionState {
        let (phase, stale) = {
            let mut core = self.inner.core.lock();
            if remote {
                core.last_persisted = Some(*fingerprint);
                core.failures = 0;
            }
            let stale = core.value.fingerprint().ok().as_ref() != Some(fingerprint);
            if !stale {
                core.dirty = false;
            }
            if matches!(core.phase, SessionState::Persisting | SessionState::Dirty | SessionState::Idle) {
                core.phase = if stale {
                    SessionState::Dirty
                } else {
                    SessionState::Idle
                };
            }
            (core.phase, stale)
        };

        if stale {
            let armed = self
                .inner
                .timer
                .lock()
                .as_ref()
                .is_some_and(|timer| !timer.is_finished());
            if !armed {
                self.schedule(self.inner.ctx.config.debounce);
            }
        }
        phase
    }

    async fn push(&self, value: &D) -> SyncResult<()> {
        let ctx = &self.inner.ctx;
        let project = ctx.config.project_name.as_str();

        if let Some(entries) = value.collection_entries() {
            let folder = ctx.folders.project(project).await?;
            let mut local: Vec<(String, Bytes)> = entries
                .into_iter()
                .map(|(name, content)| (name, Bytes::from(content)))
                .collect();
            for blob in value.encode_blobs()? {
                local.push((blob.slot.name.to_string(), Bytes::from(blob.bytes)));
            }

            let outcome = DiffSynchronizer::new(ctx.remote.clone(), ctx.config.strategy)
                .with_skip_unchanged(ctx.config.skip_unchanged)
                .with_progress(ctx.status.clone(), D::KIND)
                .sync(&folder, local)
                .await?;
            tracing::debug!(
                document = %D::KIND,
                created = outcome.created.len(),
                updated = outcome.updated.len(),
                skipped = outcome.skipped.len(),
                "Pushed collection"
            );
            outcome.into_result().map(|_| ())
        } else {
            let blobs = value.encode_blobs()?;
            let total = blobs.len();
            self.publish(|d| {
                d.total_items = total;
                d.completed_items = 0;
            });
            for blob in blobs {
                let folder = ctx.folders.slot_folder(blob.slot, project).await?;
                upsert_named(
                    ctx.remote.as_ref(),
                    &folder,
                    blob.slot.name,
                    Bytes::from(blob.bytes),
                    JSON_MIME,
                )
                .await?;
                self.publish(|d| d.completed_items += 1);
            }
            Ok(())
        }
    }

    async fn read_remote(&self) -> SyncResult<Option<D>> {
        let ctx = &self.inner.ctx;
        let project = ctx.config.project_name.as_str();
        let slots = D::KIND.blob_slots();

        let mut parts = Vec::with_capacity(slots.len());
        for slot in slots {
            let folder = ctx.folders.slot_folder(*slot, project).await?;
            let mut read = read_named(ctx.remote.as_ref(), &folder, &[slot.name]).await?;
            parts.push(read.pop().flatten().map(|bytes| bytes.to_vec()));
        }

        D::decode_blobs(&parts).map_err(|err| SyncError::MalformedRemoteData {
            document: D::KIND.to_string(),
            reason: err.to_string(),
        })
    }

    /// Resolves consent for pushing a local or default value and returns
    /// whether remote writes are allowed.
    async fn settle_consent(
        &self,
        key: &StoreKey,
        value: &D,
        source: HydrateSource,
        owner: Option<&str>,
    ) -> bool {
        match self.consent(key) {
            ConsentStatus::Enabled => true,
            ConsentStatus::Declined => false,
            ConsentStatus::Unset => {
                if source == HydrateSource::Default || value.is_empty() {
                    self.record_consent(key, ConsentStatus::Enabled);
                    return true;
                }
                let decision = self.inner.ctx.prompt.request(D::KIND, owner).await;
                match decision.status() {
                    Some(status) => {
                        self.record_consent(key, status);
                        status.allows_remote_writes()
                    }
                    None => false,
                }
            }
        }
    }

    fn consent(&self, key: &StoreKey) -> ConsentStatus {
        self.inner.ctx.consent.status(key).unwrap_or_else(|err| {
            tracing::warn!(key = %key, error = %err, "Unreadable consent record");
            ConsentStatus::Unset
        })
    }

    fn record_consent(&self, key: &StoreKey, status: ConsentStatus) {
        if let Err(err) = self.inner.ctx.consent.set(key, status) {
            tracing::warn!(key = %key, error = %err, "Failed to record consent");
        }
    }

    fn read_cache(&self, key: &StoreKey) -> Option<D> {
        let raw = match self.inner.ctx.cache.get(key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Local cache read failed");
                return None;
            }
        };
        match D::decode_cache(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    fn write_cache(&self, key: &StoreKey, value: &D) {
        let result = value
            .encode_cache()
            .map_err(SyncError::from)
            .and_then(|raw| self.inner.ctx.cache.set(key, &raw).map_err(SyncError::from));
        if let Err(err) = result {
            tracing::warn!(key = %key, error = %err, "Local cache write failed");
        }
    }

    fn publish(&self, f: impl FnOnce(&mut crate::status::DocumentStatus)) {
        self.inner.ctx.status.update(D::KIND, f);
    }

    fn cancel_timer(&self) {
        if let Some(timer) = self.inner.timer.lock().take() {
            timer.abort();
        }
    }

    /// Arms the debounce timer, replacing a pending one. When it fires the
    /// persist runs on its own task so a later cancel cannot interrupt it.
    fn schedule(&self, delay: Duration) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(document = %D::KIND, "No async runtime; persist not scheduled");
            return;
        };
        let weak: Weak<Inner<D>> = Arc::downgrade(&self.inner);
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                let session = DocumentSyncSession { inner };
                tokio::spawn(async move {
                    // Failures are already recorded in the status.
                    let _ = session.persist().await;
                });
            }
        });
        if let Some(previous) = self.inner.timer.lock().replace(timer) {
            previous.abort();
        }
    }
}

impl<D: Document> fmt::Debug for DocumentSyncSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("DocumentSyncSession")
            .field("kind", &D::KIND)
            .field("phase", &core.phase)
            .field("dirty", &core.dirty)
            .field("hydrated", &core.hydrated)
            .finish_non_exhaustive()
    }
}

/// Type-erased view of a session, held by the engine's registry.
#[async_trait]
pub(crate) trait ManagedSession: Send + Sync {
    async fn hydrate(&self) -> HydrateSource;
    async fn flush(&self) -> SyncResult<()>;
    fn disconnect(&self);
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<D: Document> ManagedSession for DocumentSyncSession<D> {
    async fn hydrate(&self) -> HydrateSource {
        DocumentSyncSession::hydrate(self).await
    }

    async fn flush(&self) -> SyncResult<()> {
        DocumentSyncSession::flush(self).await
    }

    fn disconnect(&self) {
        DocumentSyncSession::disconnect(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
