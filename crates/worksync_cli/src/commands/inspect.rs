//! Inspect command implementation.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use worksync_model::{
    AppSettings, Document, DocumentKind, ExtensionRegistry, FileTree, SdkRegistry,
};
use worksync_store::{FileStore, KeyValueStore};

/// Local store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Number of keys.
    pub key_count: usize,
    /// Total size of the stored values in bytes.
    pub total_size: u64,
    /// Cached documents.
    pub documents: Vec<DocumentEntry>,
    /// Consent decisions.
    pub consent: Vec<ConsentEntry>,
    /// Keys that match no known layout.
    pub unknown: Vec<String>,
}

/// One cached document.
#[derive(Debug, Serialize)]
pub struct DocumentEntry {
    /// Store key.
    pub key: String,
    /// Document kind.
    pub kind: String,
    /// Owner part of the key, absent for legacy keys.
    pub owner: Option<String>,
    /// Envelope schema version, 0 for unversioned payloads.
    pub schema_version: u64,
    /// Size in bytes.
    pub size: u64,
    /// Fingerprint of the decoded value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Short description of the content.
    pub summary: String,
}

/// One consent decision.
#[derive(Debug, Serialize)]
pub struct ConsentEntry {
    /// Store key.
    pub key: String,
    /// Recorded status, or the parse failure.
    pub status: String,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(path)?;
    let result = inspect(&store, &path.display().to_string())?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Builds the inspection result for any key-value store.
pub fn inspect(
    store: &dyn KeyValueStore,
    path: &str,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut result = InspectResult {
        path: path.to_string(),
        key_count: 0,
        total_size: 0,
        documents: Vec::new(),
        consent: Vec::new(),
        unknown: Vec::new(),
    };

    for key in store.keys()? {
        let Some(raw) = store.get(&key)? else {
            continue;
        };
        result.key_count += 1;
        result.total_size += raw.len() as u64;

        if let Some(kind) = consent_kind(&key) {
            let status = serde_json::from_str::<Value>(&raw)
                .ok()
                .and_then(|v| v.get("status").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "unreadable".to_string());
            tracing::debug!(key = %key, kind = %kind, "Consent record");
            result.consent.push(ConsentEntry { key, status });
        } else if let Some((kind, owner)) = cache_kind(&key) {
            result.documents.push(describe(key, kind, owner, &raw));
        } else {
            result.unknown.push(key);
        }
    }

    Ok(result)
}

fn consent_kind(key: &str) -> Option<DocumentKind> {
    DocumentKind::ALL.into_iter().find(|kind| {
        key.strip_prefix(kind.consent_prefix())
            .is_some_and(|rest| rest.starts_with('_'))
    })
}

fn cache_kind(key: &str) -> Option<(DocumentKind, Option<String>)> {
    DocumentKind::ALL.into_iter().find_map(|kind| {
        let rest = key.strip_prefix(kind.key_prefix())?;
        if rest.is_empty() {
            return Some((kind, None));
        }
        rest.strip_prefix('_')
            .map(|owner| (kind, Some(owner.to_string())))
    })
}

fn describe(key: String, kind: DocumentKind, owner: Option<String>, raw: &str) -> DocumentEntry {
    let schema_version = serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.get("schemaVersion").and_then(Value::as_u64))
        .unwrap_or(0);

    let decoded = match kind {
        DocumentKind::Workspace => summarize::<FileTree>(raw, |t| {
            format!("{} files, {} nodes", t.files().len(), t.len())
        }),
        DocumentKind::Settings => summarize::<AppSettings>(raw, |s| {
            if Document::is_empty(s) {
                "defaults".to_string()
            } else {
                format!("font size {}, theme {}", s.editor.font_size, s.editor.theme)
            }
        }),
        DocumentKind::Extensions => summarize::<ExtensionRegistry>(raw, |r| {
            format!("{} installed, {} in marketplace", r.installed.len(), r.marketplace.len())
        }),
        DocumentKind::Sdk => summarize::<SdkRegistry>(raw, |r| {
            format!("{} SDKs, {} plugins", r.sdks.len(), r.plugins.len())
        }),
    };

    let (fingerprint, summary) = match decoded {
        Ok((fingerprint, summary)) => (Some(fingerprint), summary),
        Err(err) => (None, format!("unreadable: {err}")),
    };

    DocumentEntry {
        key,
        kind: kind.to_string(),
        owner,
        schema_version,
        size: raw.len() as u64,
        fingerprint,
        summary,
    }
}

fn summarize<D: Document>(
    raw: &str,
    describe: impl FnOnce(&D) -> String,
) -> Result<(String, String), worksync_model::ModelError> {
    let value = D::decode_cache(raw)?;
    let fingerprint = value.fingerprint()?.to_hex();
    Ok((fingerprint, describe(&value)))
}

fn print_text_output(result: &InspectResult) {
    println!("worksync Local Store Inspection");
    println!("===============================");
    println!();
    println!("Path: {}", result.path);
    println!("Keys: {}", result.key_count);
    println!("Size: {} bytes", format_size(result.total_size));

    println!();
    println!("Documents:");
    if result.documents.is_empty() {
        println!("  (none)");
    }
    for doc in &result.documents {
        println!(
            "  {} [{} @ {}] v{} {} bytes: {}",
            doc.key,
            doc.kind,
            doc.owner.as_deref().unwrap_or("legacy"),
            doc.schema_version,
            format_size(doc.size),
            doc.summary
        );
        if let Some(fingerprint) = &doc.fingerprint {
            println!("    fingerprint {}", &fingerprint[..16]);
        }
    }

    println!();
    println!("Consent:");
    if result.consent.is_empty() {
        println!("  (none)");
    }
    for entry in &result.consent {
        println!("  {}: {}", entry.key, entry.status);
    }

    if !result.unknown.is_empty() {
        println!();
        println!("Unrecognized keys:");
        for key in &result.unknown {
            println!("  {}", key);
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
