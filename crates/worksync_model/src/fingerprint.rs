//! Content fingerprints.

use crate::error::ModelResult;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 over the canonical JSON encoding of a value.
///
/// Two values with equal fingerprints serialize identically, which is what
/// stale-write detection compares.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprints any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> ModelResult<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::of_bytes(&bytes))
    }

    /// Fingerprints raw bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}
