//! Extension registry document.

use crate::document::{all_missing, decode_part, Blob, Document};
use crate::envelope;
use crate::error::ModelResult;
use crate::kind::DocumentKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifying part of an extension manifest.
///
/// Fields this crate does not interpret are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Unique extension id.
    pub id: String,
    /// Package name.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Remaining manifest fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An installed or listed extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    /// The manifest.
    pub manifest: ExtensionManifest,
    /// Install state, ratings and the like.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionRecord {
    /// A record with only the identifying manifest fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            manifest: ExtensionManifest {
                id: id.into(),
                name: name.into(),
                version: version.into(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    /// The extension id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.manifest.id
    }
}

/// Installed extensions and community marketplace listings.
///
/// Persisted as two blobs; a blob missing remotely reads as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionRegistry {
    /// Installed extensions.
    pub installed: Vec<ExtensionRecord>,
    /// Community marketplace listings.
    pub marketplace: Vec<ExtensionRecord>,
}

impl ExtensionRegistry {
    /// Adds or replaces an installed extension, keyed by id.
    pub fn install(&mut self, record: ExtensionRecord) {
        upsert(&mut self.installed, record);
    }

    /// Removes an installed extension. Returns `true` if it was present.
    pub fn uninstall(&mut self, id: &str) -> bool {
        let before = self.installed.len();
        self.installed.retain(|r| r.id() != id);
        before != self.installed.len()
    }

    /// Adds or replaces a marketplace listing, keyed by id.
    pub fn publish(&mut self, record: ExtensionRecord) {
        upsert(&mut self.marketplace, record);
    }

    /// Looks up an installed extension.
    #[must_use]
    pub fn installed(&self, id: &str) -> Option<&ExtensionRecord> {
        self.installed.iter().find(|r| r.id() == id)
    }
}

fn upsert(list: &mut Vec<ExtensionRecord>, record: ExtensionRecord) {
    match list.iter_mut().find(|r| r.id() == record.id()) {
        Some(existing) => *existing = record,
        None => list.push(record),
    }
}

impl Document for ExtensionRegistry {
    const KIND: DocumentKind = DocumentKind::Extensions;

    fn default_value() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.installed.is_empty() && self.marketplace.is_empty()
    }

    fn encode_blobs(&self) -> ModelResult<Vec<Blob>> {
        let slots = Self::KIND.blob_slots();
        Ok(vec![
            Blob {
                slot: slots[0],
                bytes: envelope::encode_bytes(&self.installed)?,
            },
            Blob {
                slot: slots[1],
                bytes: envelope::encode_bytes(&self.marketplace)?,
            },
        ])
    }

    fn decode_blobs(parts: &[Option<Vec<u8>>]) -> ModelResult<Option<Self>> {
        if all_missing(parts) {
            return Ok(None);
        }
        let registry = Self::migrations();
        Ok(Some(Self {
            installed: decode_part(parts.first().and_then(Option::as_ref), &registry)?,
            marketplace: decode_part(parts.get(1).and_then(Option::as_ref), &registry)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_replaces_by_id() {
        let mut reg = ExtensionRegistry::default();
        reg.install(ExtensionRecord::new("lint", "Linter", "1.0.0"));
        reg.install(ExtensionRecord::new("lint", "Linter", "1.1.0"));
        assert_eq!(reg.installed.len(), 1);
        assert_eq!(reg.installed("lint").unwrap().manifest.version, "1.1.0");
        assert!(reg.uninstall("lint"));
        assert!(!reg.uninstall("lint"));
    }

    #[test]
    fn unknown_fields_survive() {
        let raw = br#"[{"manifest":{"id":"x","name":"X","version":"1","license":"MIT"},"enabled":true}]"#;
        let reg = ExtensionRegistry::decode_blobs(&[Some(raw.to_vec()), None])
            .unwrap()
            .unwrap();
        let record = &reg.installed[0];
        assert_eq!(record.manifest.extra["license"], "MIT");
        assert_eq!(record.extra["enabled"], true);
        assert!(reg.marketplace.is_empty());

        let blobs = reg.encode_blobs().unwrap();
        let text = String::from_utf8(blobs[0].bytes.clone()).unwrap();
        assert!(text.contains("\"license\":\"MIT\""));
        assert!(text.contains("\"enabled\":true"));
    }

    #[test]
    fn encodes_two_blobs() {
        let mut reg = ExtensionRegistry::default();
        reg.publish(ExtensionRecord::new("theme", "Theme", "2.0.0"));
        let blobs = reg.encode_blobs().unwrap();
        assert_eq!(blobs[0].slot.name, "extensions-installed.json");
        assert_eq!(blobs[1].slot.name, "extensions-marketplace.json");
        let parts: Vec<_> = blobs.into_iter().map(|b| Some(b.bytes)).collect();
        assert_eq!(ExtensionRegistry::decode_blobs(&parts).unwrap().unwrap(), reg);
    }

    #[test]
    fn absent_when_every_blob_missing() {
        assert!(ExtensionRegistry::decode_blobs(&[None, None]).unwrap().is_none());
    }

    #[test]
    fn malformed_part_fails_whole_document() {
        let result = ExtensionRegistry::decode_blobs(&[Some(b"{oops".to_vec()), None]);
        assert!(result.is_err());
    }
}
