//! # worksync remote
//!
//! The boundary between the sync engine and a remote object store.
//!
//! This crate provides:
//! - [`RemoteStore`] - the async adapter contract (resolve, list, read,
//!   create, update, delete)
//! - [`FolderResolver`] - memoized find-or-create of the well-known folder
//!   layout
//! - [`read_named`] / [`upsert_named`] - name-addressed helpers built on
//!   the adapter
//! - [`MemoryRemoteStore`] - an in-memory store with latency, outages and
//!   failure injection for tests and benchmarks
//!
//! Adapters never retry; retry policy belongs to the caller.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod folders;
mod memory;
mod named;
mod store;

pub use error::{RemoteError, RemoteResult};
pub use folders::{FolderResolver, RootFolders};
pub use memory::{CallCounts, MemoryRemoteStore};
pub use named::{index_by_name, read_named, upsert_named};
pub use store::{content_hash, RemoteEntry, RemoteStore};
