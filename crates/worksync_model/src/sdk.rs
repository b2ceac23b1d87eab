//! SDK registry document.

use crate::document::{all_missing, decode_part, Blob, Document};
use crate::envelope;
use crate::error::ModelResult;
use crate::kind::DocumentKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One SDK known to the IDE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkRecord {
    /// Unique SDK id, e.g. `android-34`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// SDK version.
    pub version: String,
    /// Target platform.
    pub platform: String,
    /// `Installed`, `Not Installed` or `Update Available`.
    pub status: String,
    /// Platform API level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_level: Option<u32>,
    /// Remaining fields (size, source, release date, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SdkRecord {
    /// Returns `true` if the SDK is installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.status == "Installed"
    }
}

/// A plugin extending an SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkPlugin {
    /// Unique plugin id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Publisher.
    #[serde(default)]
    pub author: String,
    /// Plugin version.
    pub version: String,
    /// Whether it is installed.
    #[serde(default)]
    pub installed: bool,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// SDK state and SDK plugins, persisted as two blobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkRegistry {
    /// Known SDKs.
    pub sdks: Vec<SdkRecord>,
    /// Known plugins.
    pub plugins: Vec<SdkPlugin>,
}

impl SdkRegistry {
    /// Sets the status of an SDK. Returns `false` if the id is unknown.
    pub fn set_status(&mut self, id: &str, status: &str) -> bool {
        match self.sdks.iter_mut().find(|s| s.id == id) {
            Some(sdk) => {
                sdk.status = status.to_string();
                true
            }
            None => false,
        }
    }

    /// Marks a plugin installed or removed. Returns `false` if unknown.
    pub fn set_plugin_installed(&mut self, id: &str, installed: bool) -> bool {
        match self.plugins.iter_mut().find(|p| p.id == id) {
            Some(plugin) => {
                plugin.installed = installed;
                true
            }
            None => false,
        }
    }

    /// SDKs for one platform.
    pub fn for_platform<'a>(&'a self, platform: &'a str) -> impl Iterator<Item = &'a SdkRecord> {
        self.sdks.iter().filter(move |s| s.platform == platform)
    }
}

impl Document for SdkRegistry {
    const KIND: DocumentKind = DocumentKind::Sdk;

    fn default_value() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.sdks.is_empty() && self.plugins.is_empty()
    }

    fn encode_blobs(&self) -> ModelResult<Vec<Blob>> {
        let slots = Self::KIND.blob_slots();
        Ok(vec![
            Blob {
                slot: slots[0],
                bytes: envelope::encode_bytes(&self.sdks)?,
            },
            Blob {
                slot: slots[1],
                bytes: envelope::encode_bytes(&self.plugins)?,
            },
        ])
    }

    fn decode_blobs(parts: &[Option<Vec<u8>>]) -> ModelResult<Option<Self>> {
        if all_missing(parts) {
            return Ok(None);
        }
        let registry = Self::migrations();
        Ok(Some(Self {
            sdks: decode_part(parts.first().and_then(Option::as_ref), &registry)?,
            plugins: decode_part(parts.get(1).and_then(Option::as_ref), &registry)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Folder;

    fn android() -> SdkRecord {
        serde_json::from_value(serde_json::json!({
            "id": "android-34",
            "name": "Android 14.0",
            "version": "14.0",
            "platform": "Android",
            "status": "Not Installed",
            "apiLevel": 34,
            "size": "145 MB",
            "source": "Official"
        }))
        .unwrap()
    }

    #[test]
    fn record_keeps_extra_fields() {
        let sdk = android();
        assert_eq!(sdk.api_level, Some(34));
        assert_eq!(sdk.extra["size"], "145 MB");
        let back = serde_json::to_value(&sdk).unwrap();
        assert_eq!(back["source"], "Official");
        assert_eq!(back["apiLevel"], 34);
    }

    #[test]
    fn status_updates() {
        let mut reg = SdkRegistry {
            sdks: vec![android()],
            plugins: vec![],
        };
        assert!(reg.set_status("android-34", "Installed"));
        assert!(reg.sdks[0].is_installed());
        assert!(!reg.set_status("ios-17", "Installed"));
        assert!(!reg.set_plugin_installed("x", true));
        assert_eq!(reg.for_platform("Android").count(), 1);
    }

    #[test]
    fn plugins_live_in_their_own_folder() {
        let blobs = SdkRegistry::default().encode_blobs().unwrap();
        assert_eq!(blobs[0].slot.folder, Folder::Sdks);
        assert_eq!(blobs[1].slot.name, "sdk-plugins.json");
        assert_eq!(blobs[1].slot.folder, Folder::Plugins);
    }

    #[test]
    fn missing_plugins_blob_defaults_to_empty() {
        let reg = SdkRegistry {
            sdks: vec![android()],
            plugins: vec![],
        };
        let sdks = reg.encode_blobs().unwrap().remove(0).bytes;
        let back = SdkRegistry::decode_blobs(&[Some(sdks), None]).unwrap().unwrap();
        assert_eq!(back, reg);
    }
}
