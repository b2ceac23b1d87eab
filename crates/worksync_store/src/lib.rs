//! # worksync store
//!
//! Durable key-value stores for the worksync engine.
//!
//! This crate provides the two local persistence contracts the engine
//! consumes:
//!
//! - [`LocalCache`] - the last known value of every synchronized document,
//!   stored as JSON text so it survives reloads
//! - [`ConsentStore`] - per-owner, per-document consent to write to the
//!   remote store
//!
//! Both sit on top of a [`KeyValueStore`] backend. Backends are plain
//! string stores with last-writer-wins semantics; they never interpret the
//! values they hold.
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and ephemeral sessions
//! - [`FileStore`] - One file per key inside a locked directory
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use worksync_store::{InMemoryStore, LocalCache, StoreKey};
//!
//! let cache = LocalCache::new(Arc::new(InMemoryStore::new()));
//! let key = StoreKey::owned("settings", Some("ada@example.com"));
//! cache.set(&key, "{\"schemaVersion\":1,\"data\":{}}").unwrap();
//! assert_eq!(key.to_string(), "settings_ada@example.com");
//! assert!(cache.get(&key).unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod cache;
mod consent;
mod error;
mod file;
mod key;
mod memory;

pub use backend::KeyValueStore;
pub use cache::LocalCache;
pub use consent::{ConsentRecord, ConsentStatus, ConsentStore};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use key::{StoreKey, DEFAULT_OWNER};
pub use memory::InMemoryStore;
