//! The contract between a synchronized value and its persisted forms.

use crate::envelope::{self, MigrationRegistry};
use crate::error::ModelResult;
use crate::fingerprint::Fingerprint;
use crate::kind::{BlobSlot, DocumentKind};
use crate::node::FileNode;
use crate::tree::FileTree;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// One encoded remote blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Where the blob lives.
    pub slot: BlobSlot,
    /// Envelope bytes.
    pub bytes: Vec<u8>,
}

/// A value synchronized by its own session.
///
/// The local cache holds the whole value as one envelope. Remotely a
/// document is one or more blobs (see [`DocumentKind::blob_slots`]);
/// collection documents additionally expose per-entry content that is
/// reconciled file by file.
pub trait Document:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
    /// Which document this is.
    const KIND: DocumentKind;

    /// Value used when neither the remote nor the cache holds one.
    fn default_value() -> Self;

    /// Returns `true` if the value carries no user data.
    fn is_empty(&self) -> bool;

    /// Migrations applied when decoding older payloads.
    fn migrations() -> MigrationRegistry {
        MigrationRegistry::standard()
    }

    /// Encodes the value into its remote blobs, in slot order.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    fn encode_blobs(&self) -> ModelResult<Vec<Blob>> {
        let slot = Self::KIND.blob_slots()[0];
        Ok(vec![Blob {
            slot,
            bytes: envelope::encode_bytes(self)?,
        }])
    }

    /// Decodes remote blobs given in slot order. `None` parts were missing
    /// remotely; `Ok(None)` means the document is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a present blob is malformed or unsupported.
    fn decode_blobs(parts: &[Option<Vec<u8>>]) -> ModelResult<Option<Self>> {
        match parts.first() {
            Some(Some(bytes)) => Ok(Some(envelope::decode_slice(bytes, &Self::migrations())?)),
            _ => Ok(None),
        }
    }

    /// Per-entry `(name, content)` pairs for collection documents.
    fn collection_entries(&self) -> Option<Vec<(String, Vec<u8>)>> {
        None
    }

    /// Fingerprint used for stale-write detection.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    fn fingerprint(&self) -> ModelResult<Fingerprint> {
        Fingerprint::of(self)
    }

    /// Encodes the value for the local cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    fn encode_cache(&self) -> ModelResult<String> {
        envelope::encode(self)
    }

    /// Decodes a local cache entry, upgrading older payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is malformed or unsupported.
    fn decode_cache(raw: &str) -> ModelResult<Self> {
        envelope::decode(raw, &Self::migrations())
    }
}

/// Decodes one part of a multi-blob document; a missing part is the
/// part's default.
pub(crate) fn decode_part<T>(part: Option<&Vec<u8>>, registry: &MigrationRegistry) -> ModelResult<T>
where
    T: DeserializeOwned + Default,
{
    match part {
        Some(bytes) => envelope::decode_slice(bytes, registry),
        None => Ok(T::default()),
    }
}

/// Returns `true` if every part of a multi-blob document is missing.
pub(crate) fn all_missing(parts: &[Option<Vec<u8>>]) -> bool {
    parts.iter().all(Option::is_none)
}

impl Document for FileTree {
    const KIND: DocumentKind = DocumentKind::Workspace;

    fn default_value() -> Self {
        let nodes = vec![
            FileNode::folder(
                "/",
                "src",
                vec![FileNode::file(
                    "/src",
                    "main.ts",
                    "export function main(): void {\n  console.log('hello');\n}\n",
                )],
            ),
            FileNode::file("/", "README.md", "# Default Project\n"),
        ];
        FileTree::from_nodes(nodes).unwrap_or_default()
    }

    fn is_empty(&self) -> bool {
        FileTree::is_empty(self)
    }

    fn collection_entries(&self) -> Option<Vec<(String, Vec<u8>)>> {
        Some(
            self.files()
                .into_iter()
                .map(|(path, content)| (path, content.into_bytes()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workspace_is_valid_and_nonempty() {
        let tree = FileTree::default_value();
        assert!(!Document::is_empty(&tree));
        assert_eq!(tree.content("/README.md"), Some("# Default Project\n"));
    }

    #[test]
    fn workspace_blob_round_trips() {
        let tree = FileTree::default_value();
        let blobs = tree.encode_blobs().unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].slot.name, "workspace.json");
        let back = FileTree::decode_blobs(&[Some(blobs[0].bytes.clone())])
            .unwrap()
            .unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn missing_blob_is_absent() {
        assert!(FileTree::decode_blobs(&[None]).unwrap().is_none());
    }

    #[test]
    fn legacy_unversioned_tree_decodes() {
        let legacy = br#"[{"name":"a.md","path":"/a.md","type":"file","content":"x"}]"#;
        let tree = FileTree::decode_blobs(&[Some(legacy.to_vec())])
            .unwrap()
            .unwrap();
        assert_eq!(tree.content("/a.md"), Some("x"));
    }

    #[test]
    fn collection_entries_are_files() {
        let tree = FileTree::default_value();
        let entries = tree.collection_entries().unwrap();
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["/src/main.ts", "/README.md"]);
    }

    #[test]
    fn cache_encoding_round_trips() {
        let tree = FileTree::default_value();
        let raw = tree.encode_cache().unwrap();
        assert!(raw.contains("\"schemaVersion\":1"));
        assert_eq!(FileTree::decode_cache(&raw).unwrap(), tree);
    }

    #[test]
    fn fingerprint_tracks_edits() {
        let mut tree = FileTree::default_value();
        let before = tree.fingerprint().unwrap();
        tree.write("/README.md", "changed").unwrap();
        assert_ne!(before, tree.fingerprint().unwrap());
    }
}
