//! Benchmark utilities.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use worksync_remote::{content_hash, MemoryRemoteStore, RemoteEntry};

pub use worksync_testkit::numbered_files;

/// Remote listing matching `local`, with every `stale_every`-th entry
/// carrying a different hash so it plans as an update.
pub fn remote_listing(local: &[(String, Bytes)], stale_every: usize) -> Vec<RemoteEntry> {
    local
        .iter()
        .enumerate()
        .map(|(i, (name, content))| {
            let hash = if stale_every > 0 && i % stale_every == 0 {
                content_hash(b"stale")
            } else {
                content_hash(content)
            };
            RemoteEntry {
                id: format!("id-{i}"),
                name: name.clone(),
                parent_id: Some("folder".to_string()),
                hash: Some(hash),
                size: Some(content.len() as u64),
                is_folder: false,
            }
        })
        .collect()
}

/// A fresh remote with one empty folder, returning the folder id.
pub fn remote_with_folder(latency: Duration) -> (Arc<MemoryRemoteStore>, String) {
    let store = Arc::new(MemoryRemoteStore::new());
    let folder = store.seed_folder(None, "bench");
    store.set_latency(latency);
    (store, folder)
}
