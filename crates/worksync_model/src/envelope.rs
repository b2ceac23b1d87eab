//! Versioned persistence envelope.
//!
//! Every persisted document is wrapped as
//! `{"schemaVersion": N, "data": <payload>}`. Payloads written before the
//! envelope existed carry no version and are read as version 0.
//!
//! ## Migrations
//!
//! Migrations are:
//! - **Forward-only**: each step upgrades a payload from `target - 1` to `target`
//! - **Pure**: they rewrite a `serde_json::Value`, nothing else
//! - **Explicit**: every step up to [`CURRENT_SCHEMA_VERSION`] must be registered
//!
//! A payload newer than [`CURRENT_SCHEMA_VERSION`] is refused with
//! [`ModelError::UnsupportedVersion`]; callers treat it as absent rather than
//! guessing at its shape.

use crate::error::{ModelError, ModelResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Schema version number.
pub type SchemaVersion = u32;

/// Version written by this build.
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = 1;

const VERSION_FIELD: &str = "schemaVersion";
const DATA_FIELD: &str = "data";

/// One forward migration step.
pub trait Migration: Send + Sync {
    /// Version this step produces. Steps start at 1.
    fn target(&self) -> SchemaVersion;

    /// Short name for logs.
    fn name(&self) -> &str;

    /// Rewrites a payload from `target - 1` to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be upgraded.
    fn up(&self, data: Value) -> ModelResult<Value>;
}

/// Adopts unversioned payloads unchanged: the first envelope version kept
/// the legacy data shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdoptLegacy;

impl Migration for AdoptLegacy {
    fn target(&self) -> SchemaVersion {
        1
    }

    fn name(&self) -> &str {
        "adopt_legacy"
    }

    fn up(&self, data: Value) -> ModelResult<Value> {
        Ok(data)
    }
}

/// Registered migrations, keyed by target version.
pub struct MigrationRegistry {
    steps: BTreeMap<SchemaVersion, Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: BTreeMap::new(),
        }
    }

    /// Registry holding [`AdoptLegacy`].
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.steps.insert(1, Box::new(AdoptLegacy));
        registry
    }

    /// Registers a step.
    ///
    /// # Errors
    ///
    /// Returns an error if a step with the same target already exists.
    pub fn register(&mut self, migration: Box<dyn Migration>) -> ModelResult<()> {
        let target = migration.target();
        if self.steps.contains_key(&target) {
            return Err(ModelError::DuplicateMigration(target));
        }
        self.steps.insert(target, migration);
        Ok(())
    }

    /// Upgrades `data` from version `from` to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// # Errors
    ///
    /// Fails if `from` is newer than current, a step is missing, or a step
    /// rejects the payload.
    pub fn upgrade(&self, from: SchemaVersion, mut data: Value) -> ModelResult<Value> {
        if from > CURRENT_SCHEMA_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: from,
                current: CURRENT_SCHEMA_VERSION,
            });
        }
        for target in (from + 1)..=CURRENT_SCHEMA_VERSION {
            let step = self
                .steps
                .get(&target)
                .ok_or(ModelError::MissingMigration(target))?;
            data = step.up(data)?;
            tracing::debug!(step = step.name(), target, "Applied schema migration");
        }
        Ok(data)
    }

    /// Target versions of every registered step.
    #[must_use]
    pub fn versions(&self) -> Vec<SchemaVersion> {
        self.steps.keys().copied().collect()
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

/// Wraps `value` in a current-version envelope.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> ModelResult<String> {
    Ok(serde_json::to_string(&envelope_value(value)?)?)
}

/// Like [`encode`], as UTF-8 bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn encode_bytes<T: Serialize + ?Sized>(value: &T) -> ModelResult<Vec<u8>> {
    Ok(serde_json::to_vec(&envelope_value(value)?)?)
}

fn envelope_value<T: Serialize + ?Sized>(value: &T) -> ModelResult<Value> {
    let mut map = Map::new();
    map.insert(VERSION_FIELD.to_string(), Value::from(CURRENT_SCHEMA_VERSION));
    map.insert(DATA_FIELD.to_string(), serde_json::to_value(value)?);
    Ok(Value::Object(map))
}

/// Reads an envelope (or a bare legacy payload) and upgrades it.
///
/// # Errors
///
/// Fails on malformed JSON, an unsupported version, a failing migration,
/// or a payload that does not match `T`.
pub fn decode<T: DeserializeOwned>(raw: &str, registry: &MigrationRegistry) -> ModelResult<T> {
    decode_slice(raw.as_bytes(), registry)
}

/// Like [`decode`], from bytes.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_slice<T: DeserializeOwned>(
    raw: &[u8],
    registry: &MigrationRegistry,
) -> ModelResult<T> {
    let value: Value = serde_json::from_slice(raw)?;
    let (version, data) = split(value)?;
    let data = registry.upgrade(version, data)?;
    Ok(serde_json::from_value(data)?)
}

/// Separates version and payload. A bare payload is version 0.
fn split(value: Value) -> ModelResult<(SchemaVersion, Value)> {
    match value {
        Value::Object(mut map)
            if map.contains_key(VERSION_FIELD) && map.contains_key(DATA_FIELD) =>
        {
            let version = map
                .get(VERSION_FIELD)
                .and_then(Value::as_u64)
                .and_then(|v| SchemaVersion::try_from(v).ok())
                .ok_or_else(|| ModelError::MigrationFailed {
                    version: 0,
                    reason: format!("{VERSION_FIELD} is not a version number"),
                })?;
            let data = map.remove(DATA_FIELD).unwrap_or(Value::Null);
            Ok((version, data))
        }
        other => Ok((0, other)),
    }
}
