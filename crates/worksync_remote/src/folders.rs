//! Memoized resolution of the remote folder layout.

use crate::error::RemoteResult;
use crate::store::RemoteStore;
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use worksync_model::{BlobSlot, Folder};

/// Ids of the root folder and every well-known subfolder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFolders {
    /// The root folder.
    pub root: String,
    /// Each well-known subfolder.
    pub folders: BTreeMap<Folder, String>,
}

/// Resolves `root/<Folder>` and `root/Projects/<project>` to ids, caching
/// every answer.
///
/// Concurrent resolutions of the same path may both reach the store; that
/// is harmless because [`RemoteStore::resolve_folder`] is idempotent, and
/// the first cached answer is kept.
pub struct FolderResolver {
    store: Arc<dyn RemoteStore>,
    root_name: String,
    cache: RwLock<HashMap<String, String>>,
}

impl FolderResolver {
    /// Creates a resolver rooted at the folder named `root_name`.
    pub fn new(store: Arc<dyn RemoteStore>, root_name: impl Into<String>) -> Self {
        Self {
            store,
            root_name: root_name.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Name of the root folder.
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Id of the root folder.
    ///
    /// # Errors
    ///
    /// Returns the store error if resolution fails.
    pub async fn root(&self) -> RemoteResult<String> {
        self.resolve(None, self.root_name.clone(), &self.root_name)
            .await
    }

    /// Id of a well-known subfolder.
    ///
    /// # Errors
    ///
    /// Returns the store error if resolution fails.
    pub async fn folder(&self, folder: Folder) -> RemoteResult<String> {
        let root = self.root().await?;
        let key = format!("{}/{}", self.root_name, folder.name());
        self.resolve(Some(root), key, folder.name()).await
    }

    /// Id of the folder holding project `name`.
    ///
    /// # Errors
    ///
    /// Returns the store error if resolution fails.
    pub async fn project(&self, name: &str) -> RemoteResult<String> {
        let projects = self.folder(Folder::Projects).await?;
        let key = format!("{}/{}/{name}", self.root_name, Folder::Projects.name());
        self.resolve(Some(projects), key, name).await
    }

    /// Folder that holds a document blob. Blobs slotted under `Projects`
    /// live in the project's own folder.
    ///
    /// # Errors
    ///
    /// Returns the store error if resolution fails.
    pub async fn slot_folder(&self, slot: BlobSlot, project: &str) -> RemoteResult<String> {
        match slot.folder {
            Folder::Projects => self.project(project).await,
            other => self.folder(other).await,
        }
    }

    /// Resolves the root and all well-known subfolders, the subfolders
    /// concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first store error.
    pub async fn ensure_root_structure(&self) -> RemoteResult<RootFolders> {
        let root = self.root().await?;
        let ids = try_join_all(Folder::ALL.map(|f| self.folder(f))).await?;
        Ok(RootFolders {
            root,
            folders: Folder::ALL.into_iter().zip(ids).collect(),
        })
    }

    /// Forgets every cached id, e.g. after the account changes.
    pub fn invalidate(&self) {
        let dropped = {
            let mut cache = self.cache.write();
            let n = cache.len();
            cache.clear();
            n
        };
        tracing::debug!(dropped, "Folder cache invalidated");
    }

    /// Number of cached paths.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    async fn resolve(&self, parent: Option<String>, key: String, name: &str) -> RemoteResult<String> {
        let cached = self.cache.read().get(&key).cloned();
        if let Some(id) = cached {
            return Ok(id);
        }
        let id = self.store.resolve_folder(parent.as_deref(), name).await?;
        let id = self.cache.write().entry(key).or_insert(id).clone();
        Ok(id)
    }
}

impl std::fmt::Debug for FolderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderResolver")
            .field("root_name", &self.root_name)
            .field("cached", &self.cached())
            .finish()
    }
}
