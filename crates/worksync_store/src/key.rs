//! Keys for owner-scoped local records.

use std::fmt;

/// Owner segment used when no account is connected.
pub const DEFAULT_OWNER: &str = "default";

/// Identifies a local record by document kind and owner.
///
/// Renders as `{kind}_{owner}`, with [`DEFAULT_OWNER`] standing in for an
/// absent owner. Different owners never share a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    kind: String,
    owner: Option<String>,
}

impl StoreKey {
    /// Creates a key for `kind`, scoped to `owner` when one is connected.
    pub fn owned(kind: impl Into<String>, owner: Option<&str>) -> Self {
        Self {
            kind: kind.into(),
            owner: owner.filter(|o| !o.is_empty()).map(str::to_string),
        }
    }

    /// Creates a key with no owner.
    pub fn unowned(kind: impl Into<String>) -> Self {
        Self::owned(kind, None)
    }

    /// The document kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The owner, if one is set.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// The unscoped key written by releases that predate per-owner records.
    #[must_use]
    pub fn legacy(&self) -> String {
        self.kind.clone()
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.kind,
            self.owner.as_deref().unwrap_or(DEFAULT_OWNER)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_part_of_key() {
        let key = StoreKey::owned("workspace", Some("ada@example.com"));
        assert_eq!(key.to_string(), "workspace_ada@example.com");
        assert_eq!(key.legacy(), "workspace");
    }

    #[test]
    fn missing_owner_uses_default() {
        assert_eq!(StoreKey::unowned("settings").to_string(), "settings_default");
        assert_eq!(
            StoreKey::owned("settings", Some("")).to_string(),
            "settings_default"
        );
    }

    #[test]
    fn owners_do_not_collide() {
        let a = StoreKey::owned("sdks", Some("a"));
        let b = StoreKey::owned("sdks", Some("b"));
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }
}
