//! Name-addressed helpers over a [`RemoteStore`].

use crate::error::{RemoteError, RemoteResult};
use crate::store::{RemoteEntry, RemoteStore};
use bytes::Bytes;
use std::collections::HashMap;

/// Maps file names to entries. On duplicate names the last listed wins;
/// folders are ignored.
pub fn index_by_name(entries: Vec<RemoteEntry>) -> HashMap<String, RemoteEntry> {
    entries
        .into_iter()
        .filter(|e| !e.is_folder)
        .map(|e| (e.name.clone(), e))
        .collect()
}

/// Reads the files `names` from `folder`, in order. Missing files are
/// `None`.
///
/// # Errors
///
/// Returns the first store error.
pub async fn read_named(
    store: &dyn RemoteStore,
    folder: &str,
    names: &[&str],
) -> RemoteResult<Vec<Option<Bytes>>> {
    let entries = index_by_name(store.list(folder).await?);
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match entries.get(*name) {
            Some(entry) => out.push(Some(store.read_bytes(&entry.id).await?)),
            None => out.push(None),
        }
    }
    Ok(out)
}

/// Overwrites the file `name` in `folder`, creating it if missing.
/// Returns the file id.
///
/// # Errors
///
/// Returns the store error, or [`RemoteError::NotFound`] if the file
/// vanished between listing and update.
pub async fn upsert_named(
    store: &dyn RemoteStore,
    folder: &str,
    name: &str,
    bytes: Bytes,
    mime_type: &str,
) -> RemoteResult<String> {
    let entries = index_by_name(store.list(folder).await?);
    match entries.get(name) {
        Some(existing) => {
            if store.update_file(&existing.id, bytes).await? {
                Ok(existing.id.clone())
            } else {
                Err(RemoteError::NotFound(existing.id.clone()))
            }
        }
        None => store.create_file(folder, name, bytes, mime_type).await,
    }
}
