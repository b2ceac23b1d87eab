//! Test fixtures and engine helpers.
//!
//! Provides an engine wired to in-memory stores, a file-backed store in a
//! temporary directory, and sample documents.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use worksync_engine::{ConsentDecision, StaticConsent, SyncConfig, SyncEngine};
use worksync_model::{Document, FileNode, FileTree, Folder};
use worksync_remote::MemoryRemoteStore;
use worksync_store::{ConsentStore, FileStore, InMemoryStore, LocalCache, StoreKey};

/// Owner used by fixtures unless a test picks another.
pub const TEST_OWNER: &str = "tester@example.com";

/// An engine over in-memory stores, with handles to inspect them.
pub struct EngineFixture {
    /// The engine under test.
    pub engine: SyncEngine,
    /// Remote store double.
    pub remote: Arc<MemoryRemoteStore>,
    /// Backend shared by the local cache and the consent store.
    pub kv: Arc<InMemoryStore>,
    /// Consent prompt double.
    pub prompt: Arc<StaticConsent>,
}

impl EngineFixture {
    /// Creates a fixture whose prompt answers `decision`.
    pub fn new(decision: ConsentDecision) -> Self {
        Self::with_config(decision, SyncConfig::default())
    }

    /// Creates a fixture with a custom configuration.
    pub fn with_config(decision: ConsentDecision, config: SyncConfig) -> Self {
        Self::with_remote(decision, config, Arc::new(MemoryRemoteStore::new()))
    }

    /// Creates a fixture over an existing remote store.
    pub fn with_remote(
        decision: ConsentDecision,
        config: SyncConfig,
        remote: Arc<MemoryRemoteStore>,
    ) -> Self {
        let kv = Arc::new(InMemoryStore::new());
        let prompt = Arc::new(StaticConsent::new(decision));
        let engine = SyncEngine::new(
            remote.clone(),
            LocalCache::new(kv.clone()),
            ConsentStore::new(kv.clone()),
            config,
            prompt.clone(),
        );
        Self {
            engine,
            remote,
            kv,
            prompt,
        }
    }

    /// A fixture whose prompt grants consent.
    pub fn granting() -> Self {
        Self::new(ConsentDecision::Granted)
    }

    /// A fixture whose prompt declines consent.
    pub fn declining() -> Self {
        Self::new(ConsentDecision::Declined)
    }

    /// Writes `value` to the local cache of `owner`.
    pub fn cache_value<D: Document>(&self, owner: Option<&str>, value: &D) {
        let raw = value.encode_cache().expect("Failed to encode cache value");
        self.cache()
            .set(&StoreKey::owned(D::KIND.key_prefix(), owner), &raw)
            .expect("Failed to write cache");
    }

    /// Reads the local cache of `owner`.
    pub fn cached_value<D: Document>(&self, owner: Option<&str>) -> Option<D> {
        let raw = self
            .cache()
            .get(&StoreKey::owned(D::KIND.key_prefix(), owner))
            .expect("Failed to read cache")?;
        Some(D::decode_cache(&raw).expect("Failed to decode cache value"))
    }

    /// Decodes the document as currently stored remotely.
    pub fn remote_value<D: Document>(&self) -> Option<D> {
        let parts: Vec<Option<Vec<u8>>> = D::KIND
            .blob_slots()
            .iter()
            .map(|slot| {
                let folder = self.folder_path(slot.folder);
                let path: Vec<&str> = folder.iter().map(String::as_str).collect();
                let id = self.remote.folder_at(&path)?;
                self.remote.file_content(&id, slot.name).map(|b| b.to_vec())
            })
            .collect();
        D::decode_blobs(&parts).expect("Malformed remote document")
    }

    /// Id of the current project's remote folder, if it exists.
    pub fn project_folder(&self) -> Option<String> {
        let path = self.folder_path(Folder::Projects);
        let path: Vec<&str> = path.iter().map(String::as_str).collect();
        self.remote.folder_at(&path)
    }

    /// Seeds the remote store with `value`, creating its folders.
    pub fn seed_remote<D: Document>(&self, value: &D) {
        for blob in value.encode_blobs().expect("Failed to encode blobs") {
            let path = self.folder_path(blob.slot.folder);
            let mut parent: Option<String> = None;
            for depth in 1..=path.len() {
                let prefix: Vec<&str> = path[..depth].iter().map(String::as_str).collect();
                let id = match self.remote.folder_at(&prefix) {
                    Some(id) => id,
                    None => self.remote.seed_folder(parent.as_deref(), &path[depth - 1]),
                };
                parent = Some(id);
            }
            let folder = parent.expect("Blob folder path is never empty");
            self.remote
                .seed_file(&folder, blob.slot.name, Bytes::from(blob.bytes));
        }
    }

    /// Lets every pending debounce, retry and write finish.
    ///
    /// Meant for tests running on a paused clock.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }

    fn cache(&self) -> LocalCache {
        LocalCache::new(self.kv.clone())
    }

    fn folder_path(&self, folder: Folder) -> Vec<String> {
        let config = self.engine.config();
        let mut path = vec![config.root_folder.clone(), folder.name().to_string()];
        if folder == Folder::Projects {
            path.push(config.project_name.clone());
        }
        path
    }
}

/// A file-backed store in a temporary directory.
pub struct TempStore {
    /// The store.
    pub store: Arc<FileStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempStore {
    /// Opens a store in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path()).expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            _temp_dir: temp_dir,
        }
    }

    /// A local cache over this store.
    pub fn cache(&self) -> LocalCache {
        LocalCache::new(self.store.clone())
    }

    /// A consent store over this store.
    pub fn consent(&self) -> ConsentStore {
        ConsentStore::new(self.store.clone())
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a file-backed store in a temporary directory.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&TempStore) -> R,
{
    let store = TempStore::new();
    f(&store)
}

/// A small project: two folders and four files.
pub fn sample_tree() -> FileTree {
    let nodes = vec![
        FileNode::folder(
            "/",
            "src",
            vec![
                FileNode::file("/src", "main.ts", "import { app } from './app';\napp();\n"),
                FileNode::file("/src", "app.ts", "export function app(): void {}\n"),
                FileNode::folder(
                    "/src",
                    "styles",
                    vec![FileNode::file("/src/styles", "site.css", "body { margin: 0; }\n")],
                ),
            ],
        ),
        FileNode::file("/", "README.md", "# Sample\n"),
    ];
    FileTree::from_nodes(nodes).expect("Sample tree is valid")
}

/// A tree of `count` files under `/files`, named `file-0000.txt` onwards.
pub fn numbered_tree(count: usize) -> FileTree {
    let children = (0..count)
        .map(|i| FileNode::file("/files", &format!("file-{i:04}.txt"), format!("content {i}\n")))
        .collect();
    FileTree::from_nodes(vec![FileNode::folder("/", "files", children)])
        .expect("Numbered tree is valid")
}

/// `count` name/content pairs for driving a diff directly.
pub fn numbered_files(count: usize) -> Vec<(String, Bytes)> {
    (0..count)
        .map(|i| (format!("file-{i:04}.txt"), Bytes::from(format!("content {i}\n"))))
        .collect()
}
