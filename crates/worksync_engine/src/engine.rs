//! The sync engine: shared collaborators and the session registry.

use crate::config::SyncConfig;
use crate::consent::ConsentPrompt;
use crate::error::SyncResult;
use crate::session::{DocumentSyncSession, HydrateSource, ManagedSession};
use crate::status::{StatusHub, SyncStatus};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use worksync_model::{AppSettings, Document, DocumentKind, ExtensionRegistry, FileTree, SdkRegistry};
use worksync_remote::{FolderResolver, RemoteStore};
use worksync_store::{ConsentRecord, ConsentStatus, ConsentStore, LocalCache, StoreKey, StoreResult};

#[derive(Debug, Clone, Default)]
pub(crate) struct Connection {
    pub(crate) connected: bool,
    pub(crate) owner: Option<String>,
}

/// Everything the sessions share.
pub(crate) struct EngineContext {
    pub(crate) remote: Arc<dyn RemoteStore>,
    pub(crate) cache: LocalCache,
    pub(crate) consent: ConsentStore,
    pub(crate) prompt: Arc<dyn ConsentPrompt>,
    pub(crate) config: SyncConfig,
    pub(crate) status: StatusHub,
    pub(crate) folders: FolderResolver,
    connection: RwLock<Connection>,
}

impl EngineContext {
    pub(crate) fn connection(&self) -> Connection {
        self.connection.read().clone()
    }

    pub(crate) fn store_key(&self, kind: DocumentKind, owner: Option<&str>) -> StoreKey {
        StoreKey::owned(kind.key_prefix(), owner)
    }

    pub(crate) fn consent_key(&self, kind: DocumentKind, owner: Option<&str>) -> StoreKey {
        StoreKey::owned(kind.consent_prefix(), owner)
    }
}

/// Keeps documents in sync between a local cache and a remote store.
///
/// The engine owns the shared collaborators (remote store, local cache,
/// consent store, status hub, folder cache) and hands them to one
/// [`DocumentSyncSession`] per document kind.
///
/// # Example
///
/// ```rust,ignore
/// let engine = SyncEngine::new(remote, cache, consent, SyncConfig::default(), prompt);
/// let sessions = engine.open_sessions();
/// engine.connect(Some("alice@example.com")).await;
/// sessions.settings.update(|s| s.editor.font_size = 16);
/// ```
pub struct SyncEngine {
    ctx: Arc<EngineContext>,
    sessions: Mutex<HashMap<DocumentKind, Arc<dyn ManagedSession>>>,
}

impl SyncEngine {
    /// Creates an engine. No remote call is made until [`Self::connect`].
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: LocalCache,
        consent: ConsentStore,
        config: SyncConfig,
        prompt: Arc<dyn ConsentPrompt>,
    ) -> Self {
        let folders = FolderResolver::new(remote.clone(), config.root_folder.clone());
        Self {
            ctx: Arc::new(EngineContext {
                remote,
                cache,
                consent,
                prompt,
                config,
                status: StatusHub::new(),
                folders,
                connection: RwLock::new(Connection::default()),
            }),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.ctx.config
    }

    /// Memoized remote folder ids.
    pub fn folders(&self) -> &FolderResolver {
        &self.ctx.folders
    }

    /// Returns `true` while connected.
    pub fn is_connected(&self) -> bool {
        self.ctx.connection.read().connected
    }

    /// Identity of the connected account.
    pub fn owner(&self) -> Option<String> {
        self.ctx.connection.read().owner.clone()
    }

    /// Connects as `owner` and hydrates every open session.
    ///
    /// Switching owners drops the cached folder ids, so the new account's
    /// layout is looked up again. Failures are recorded in the status.
    pub async fn connect(&self, owner: Option<&str>) -> Vec<(DocumentKind, HydrateSource)> {
        {
            let mut connection = self.ctx.connection.write();
            let owner = owner.filter(|o| !o.is_empty()).map(str::to_string);
            if connection.owner != owner {
                self.ctx.folders.invalidate();
            }
            connection.owner = owner;
            connection.connected = true;
        }
        self.ctx.status.set_connected(true);
        tracing::info!(owner = owner.unwrap_or("-"), "Connected");

        if let Err(err) = self.ctx.folders.ensure_root_structure().await {
            tracing::warn!(error = %err, "Failed to prepare remote folders");
        }
        self.hydrate_open().await
    }

    /// Disconnects. Pending edits are saved locally and remote writes stop
    /// until the next [`Self::connect`].
    pub fn disconnect(&self) {
        for (_, session) in self.open() {
            session.disconnect();
        }
        {
            let mut connection = self.ctx.connection.write();
            connection.connected = false;
        }
        self.ctx.folders.invalidate();
        self.ctx.status.set_connected(false);
        tracing::info!("Disconnected");
    }

    /// Consent status of `kind` for the current owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record cannot be read.
    pub fn consent_status(&self, kind: DocumentKind) -> StoreResult<ConsentStatus> {
        self.ctx.consent.status(&self.key(kind))
    }

    /// Records an explicit consent decision for the current owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn set_consent(&self, kind: DocumentKind, status: ConsentStatus) -> StoreResult<()> {
        tracing::info!(document = %kind, status = %status, "Consent changed");
        self.ctx.consent.set(&self.key(kind), status)
    }

    /// Forgets the consent decision of `kind` for the current owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be removed.
    pub fn revoke_consent(&self, kind: DocumentKind) -> StoreResult<()> {
        self.ctx.consent.revoke(&self.key(kind))
    }

    /// Every stored consent decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    pub fn consent_records(&self) -> StoreResult<Vec<ConsentRecord>> {
        self.ctx.consent.records()
    }

    /// Current sync status.
    pub fn status(&self) -> SyncStatus {
        self.ctx.status.snapshot()
    }

    /// Subscribes to sync status changes. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.ctx.status.subscribe()
    }

    /// The session for document `D`, created on first use.
    pub fn session<D: Document>(&self) -> DocumentSyncSession<D> {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(&D::KIND) {
            if let Some(session) = existing.as_any().downcast_ref::<DocumentSyncSession<D>>() {
                return session.clone();
            }
        }
        let session = DocumentSyncSession::<D>::new(Arc::clone(&self.ctx));
        sessions.insert(D::KIND, Arc::new(session.clone()));
        session
    }

    /// Opens the session of every document kind.
    pub fn open_sessions(&self) -> Sessions {
        Sessions {
            workspace: self.session(),
            settings: self.session(),
            extensions: self.session(),
            sdk: self.session(),
        }
    }

    /// Persists every open session now.
    ///
    /// # Errors
    ///
    /// Returns the first failure; every session is still attempted.
    pub async fn flush(&self) -> SyncResult<()> {
        let results = join_all(self.open().into_iter().map(|(_, s)| async move { s.flush().await })).await;
        results.into_iter().collect::<SyncResult<Vec<()>>>().map(|_| ())
    }

    fn key(&self, kind: DocumentKind) -> StoreKey {
        self.ctx.consent_key(kind, self.owner().as_deref())
    }

    fn open(&self) -> Vec<(DocumentKind, Arc<dyn ManagedSession>)> {
        let mut open: Vec<_> = self
            .sessions
            .lock()
            .iter()
            .map(|(kind, s)| (*kind, Arc::clone(s)))
            .collect();
        open.sort_by_key(|(kind, _)| *kind);
        open
    }

    async fn hydrate_open(&self) -> Vec<(DocumentKind, HydrateSource)> {
        let open = self.open();
        join_all(
            open.into_iter()
                .map(|(kind, session)| async move { (kind, session.hydrate().await) }),
        )
        .await
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("connected", &self.is_connected())
            .field("owner", &self.owner())
            .field("sessions", &self.sessions.lock().len())
            .finish_non_exhaustive()
    }
}

/// One session per document kind.
#[derive(Debug, Clone)]
pub struct Sessions {
    /// Project file tree.
    pub workspace: DocumentSyncSession<FileTree>,
    /// Application settings.
    pub settings: DocumentSyncSession<AppSettings>,
    /// Extension registry.
    pub extensions: DocumentSyncSession<ExtensionRegistry>,
    /// SDK registry.
    pub sdk: DocumentSyncSession<SdkRegistry>,
}

impl Sessions {
    /// Hydrates every session concurrently.
    pub async fn hydrate_all(&self) -> [(DocumentKind, HydrateSource); 4] {
        let (w, s, e, k) = tokio::join!(
            self.workspace.hydrate(),
            self.settings.hydrate(),
            self.extensions.hydrate(),
            self.sdk.hydrate(),
        );
        [
            (DocumentKind::Workspace, w),
            (DocumentKind::Settings, s),
            (DocumentKind::Extensions, e),
            (DocumentKind::Sdk, k),
        ]
    }

    /// Persists every session now.
    ///
    /// # Errors
    ///
    /// Returns the first failure; every session is still attempted.
    pub async fn flush_all(&self) -> SyncResult<()> {
        let (w, s, e, k) = tokio::join!(
            self.workspace.flush(),
            self.settings.flush(),
            self.extensions.flush(),
            self.sdk.flush(),
        );
        w.and(s).and(e).and(k)
    }

    /// Disconnects every session.
    pub fn disconnect_all(&self) {
        self.workspace.disconnect();
        self.settings.disconnect();
        self.extensions.disconnect();
        self.sdk.disconnect();
    }
}
