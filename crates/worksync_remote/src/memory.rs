//! In-memory remote store for tests and benchmarks.

use crate::error::{RemoteError, RemoteResult};
use crate::store::{content_hash, RemoteEntry, RemoteStore};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Object {
    name: String,
    parent: Option<String>,
    is_folder: bool,
    data: Bytes,
}

impl Object {
    fn entry(&self, id: &str) -> RemoteEntry {
        RemoteEntry {
            id: id.to_string(),
            name: self.name.clone(),
            parent_id: self.parent.clone(),
            hash: (!self.is_folder).then(|| content_hash(&self.data)),
            size: (!self.is_folder).then_some(self.data.len() as u64),
            is_folder: self.is_folder,
        }
    }
}

/// Per-operation call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `resolve_folder` calls.
    pub resolve: u64,
    /// `list` calls.
    pub list: u64,
    /// `read_bytes` calls.
    pub read: u64,
    /// `create_file` calls.
    pub create: u64,
    /// `update_file` calls.
    pub update: u64,
    /// `delete_file` calls.
    pub delete: u64,
}

impl CallCounts {
    /// Calls that modify the store.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.create + self.update + self.delete
    }
}

#[derive(Debug, Default)]
struct Counters {
    resolve: AtomicU64,
    list: AtomicU64,
    read: AtomicU64,
    create: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
}

/// An in-memory [`RemoteStore`].
///
/// Useful for tests and benchmarks:
/// - a fixed latency applied to every call (tokio timer, so paused-clock
///   tests stay exact)
/// - an offline switch that makes every call fail with
///   [`RemoteError::Unreachable`]
/// - per-name write failure injection
/// - call counters and a peak in-flight gauge
///
/// Ids are random UUIDs; hashes are hex SHA-256.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    objects: RwLock<BTreeMap<String, Object>>,
    latency: Mutex<Duration>,
    online: AtomicBool,
    failing: RwLock<HashSet<String>>,
    counters: Counters,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryRemoteStore {
    /// Creates an empty, online store with no latency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            latency: Mutex::new(Duration::ZERO),
            online: AtomicBool::new(true),
            failing: RwLock::new(HashSet::new()),
            counters: Counters::default(),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Creates a store that delays every call by `latency`.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        let store = Self::new();
        store.set_latency(latency);
        store
    }

    /// Changes the per-call latency.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Takes the store offline or back online.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Returns `true` if the store is reachable.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Makes every create/update of objects named `name` fail.
    pub fn fail_writes_for(&self, name: impl Into<String>) {
        self.failing.write().insert(name.into());
    }

    /// Removes every injected failure.
    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            resolve: c.resolve.load(Ordering::SeqCst),
            list: c.list.load(Ordering::SeqCst),
            read: c.read.load(Ordering::SeqCst),
            create: c.create.load(Ordering::SeqCst),
            update: c.update.load(Ordering::SeqCst),
            delete: c.delete.load(Ordering::SeqCst),
        }
    }

    /// Zeroes the call counters and the peak gauge.
    pub fn reset_counters(&self) {
        let c = &self.counters;
        for counter in [
            &c.resolve, &c.list, &c.read, &c.create, &c.update, &c.delete,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.peak_in_flight.store(0, Ordering::SeqCst);
    }

    /// Highest number of calls observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Inserts a folder directly, bypassing latency and counters.
    pub fn seed_folder(&self, parent: Option<&str>, name: &str) -> String {
        self.insert(parent, name, true, Bytes::new())
    }

    /// Inserts a file directly, bypassing latency and counters.
    pub fn seed_file(&self, folder: &str, name: &str, data: impl Into<Bytes>) -> String {
        self.insert(Some(folder), name, false, data.into())
    }

    /// Looks up a folder by its name path from the store root, e.g.
    /// `["worksync", "Settings"]`.
    #[must_use]
    pub fn folder_at(&self, path: &[&str]) -> Option<String> {
        let objects = self.objects.read();
        let mut parent: Option<String> = None;
        for name in path {
            let id = objects
                .iter()
                .find(|(_, o)| o.is_folder && o.name == *name && o.parent == parent)
                .map(|(id, _)| id.clone())?;
            parent = Some(id);
        }
        parent
    }

    /// Content of the file `name` inside `folder`.
    #[must_use]
    pub fn file_content(&self, folder: &str, name: &str) -> Option<Bytes> {
        self.objects
            .read()
            .values()
            .find(|o| !o.is_folder && o.name == name && o.parent.as_deref() == Some(folder))
            .map(|o| o.data.clone())
    }

    /// Names of the files inside `folder`, sorted.
    #[must_use]
    pub fn file_names(&self, folder: &str) -> Vec<String> {
        let mut names: Vec<_> = self
            .objects
            .read()
            .values()
            .filter(|o| !o.is_folder && o.parent.as_deref() == Some(folder))
            .map(|o| o.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Total number of stored objects, folders included.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    fn insert(&self, parent: Option<&str>, name: &str, is_folder: bool, data: Bytes) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.objects.write().insert(
            id.clone(),
            Object {
                name: name.to_string(),
                parent: parent.map(str::to_string),
                is_folder,
                data,
            },
        );
        id
    }

    /// Counts the call, waits out the latency, then checks reachability.
    async fn enter(&self, counter: &AtomicU64) -> RemoteResult<InFlight<'_>> {
        counter.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if !self.is_online() {
            return Err(RemoteError::Unreachable("store is offline".into()));
        }
        Ok(guard)
    }

    fn check_failure(&self, operation: &'static str, name: &str) -> RemoteResult<()> {
        if self.failing.read().contains(name) {
            return Err(RemoteError::rejected(
                operation,
                format!("injected failure for {name}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn resolve_folder(&self, parent: Option<&str>, name: &str) -> RemoteResult<String> {
        let _guard = self.enter(&self.counters.resolve).await?;
        let mut objects = self.objects.write();
        if let Some((id, _)) = objects
            .iter()
            .find(|(_, o)| o.is_folder && o.name == name && o.parent.as_deref() == parent)
        {
            return Ok(id.clone());
        }
        let id = uuid::Uuid::new_v4().to_string();
        objects.insert(
            id.clone(),
            Object {
                name: name.to_string(),
                parent: parent.map(str::to_string),
                is_folder: true,
                data: Bytes::new(),
            },
        );
        tracing::trace!(folder = name, id = %id, "Created remote folder");
        Ok(id)
    }

    async fn list(&self, folder: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let _guard = self.enter(&self.counters.list).await?;
        let objects = self.objects.read();
        if !objects.get(folder).is_some_and(|o| o.is_folder) {
            return Err(RemoteError::NotFound(folder.to_string()));
        }
        Ok(objects
            .iter()
            .filter(|(_, o)| o.parent.as_deref() == Some(folder))
            .map(|(id, o)| o.entry(id))
            .collect())
    }

    async fn read_bytes(&self, id: &str) -> RemoteResult<Bytes> {
        let _guard = self.enter(&self.counters.read).await?;
        self.objects
            .read()
            .get(id)
            .filter(|o| !o.is_folder)
            .map(|o| o.data.clone())
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn create_file(
        &self,
        folder: &str,
        name: &str,
        bytes: Bytes,
        _mime_type: &str,
    ) -> RemoteResult<String> {
        let _guard = self.enter(&self.counters.create).await?;
        self.check_failure("create", name)?;
        if !self.objects.read().get(folder).is_some_and(|o| o.is_folder) {
            return Err(RemoteError::NotFound(folder.to_string()));
        }
        Ok(self.insert(Some(folder), name, false, bytes))
    }

    async fn update_file(&self, id: &str, bytes: Bytes) -> RemoteResult<bool> {
        let _guard = self.enter(&self.counters.update).await?;
        let name = match self.objects.read().get(id) {
            Some(o) if !o.is_folder => o.name.clone(),
            _ => return Ok(false),
        };
        self.check_failure("update", &name)?;
        match self.objects.write().get_mut(id) {
            Some(object) => {
                object.data = bytes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_file(&self, id: &str) -> RemoteResult<bool> {
        let _guard = self.enter(&self.counters.delete).await?;
        let mut objects = self.objects.write();
        if objects.get(id).is_some_and(|o| o.is_folder) {
            return Err(RemoteError::rejected("delete", "refusing to delete a folder"));
        }
        Ok(objects.remove(id).is_some())
    }
}
