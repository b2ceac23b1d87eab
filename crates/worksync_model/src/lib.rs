//! # worksync model
//!
//! The values worksync keeps in sync.
//!
//! This crate provides:
//! - [`FileTree`] - arena-backed workspace tree of [`FileNode`]s
//! - [`AppSettings`], [`ExtensionRegistry`], [`SdkRegistry`] - scalar documents
//! - [`Document`] - how each value maps onto cache entries and remote blobs
//! - [`Fingerprint`] - content hash used for stale-write detection
//! - [`envelope`] - the `schemaVersion` wrapper and its migrations
//!
//! Nothing here performs I/O; every type is a plain value that the engine
//! clones, fingerprints and serializes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
pub mod envelope;
mod error;
mod extensions;
mod fingerprint;
mod kind;
mod node;
mod sdk;
mod settings;
mod tree;

pub use document::{Blob, Document};
pub use envelope::{Migration, MigrationRegistry, SchemaVersion, CURRENT_SCHEMA_VERSION};
pub use error::{ModelError, ModelResult};
pub use extensions::{ExtensionManifest, ExtensionRecord, ExtensionRegistry};
pub use fingerprint::Fingerprint;
pub use kind::{BlobSlot, DocumentKind, Folder, JSON_MIME};
pub use node::{join_path, language_for, FileNode, NodeKind, ROOT_PATH};
pub use sdk::{SdkPlugin, SdkRecord, SdkRegistry};
pub use settings::{
    AiSettings, AppSettings, CursorStyle, DebugSettings, EditorSettings, ExplorerSettings,
    GeneralSettings, LineNumbers, SortOrder, TerminalSettings, ThemePreference, WordWrap,
};
pub use tree::FileTree;
