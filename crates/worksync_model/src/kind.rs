//! Document kinds and where they live remotely.

use std::fmt;

/// MIME type of every persisted JSON blob.
pub const JSON_MIME: &str = "application/json";

/// Well-known subfolders of the remote root folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Folder {
    /// Parent of one folder per project.
    Projects,
    /// Extension registry blobs.
    Extensions,
    /// SDK state.
    Sdks,
    /// SDK plugins.
    Plugins,
    /// Application settings.
    Settings,
}

impl Folder {
    /// Every well-known subfolder.
    pub const ALL: [Folder; 5] = [
        Folder::Projects,
        Folder::Extensions,
        Folder::Sdks,
        Folder::Plugins,
        Folder::Settings,
    ];

    /// Remote folder name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Projects => "Projects",
            Self::Extensions => "Extensions",
            Self::Sdks => "SDKs",
            Self::Plugins => "Plugins",
            Self::Settings => "Settings",
        }
    }
}

/// Where one remote blob of a document lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobSlot {
    /// Remote file name.
    pub name: &'static str,
    /// Containing folder. `Projects` means the current project's folder.
    pub folder: Folder,
}

/// The independently synchronized documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    /// The project file tree.
    Workspace,
    /// Application settings.
    Settings,
    /// Installed and marketplace extensions.
    Extensions,
    /// SDKs and SDK plugins.
    Sdk,
}

impl DocumentKind {
    /// Every document kind.
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Workspace,
        DocumentKind::Settings,
        DocumentKind::Extensions,
        DocumentKind::Sdk,
    ];

    /// Prefix of local cache keys.
    #[must_use]
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Settings => "settings",
            Self::Extensions => "extensions",
            Self::Sdk => "sdk",
        }
    }

    /// Prefix of consent keys. Distinct from [`Self::key_prefix`] so both
    /// can share one backend.
    #[must_use]
    pub fn consent_prefix(self) -> &'static str {
        match self {
            Self::Workspace => "workspace-consent",
            Self::Settings => "settings-consent",
            Self::Extensions => "extensions-consent",
            Self::Sdk => "sdk-consent",
        }
    }

    /// Remote blobs, in encode order.
    #[must_use]
    pub fn blob_slots(self) -> &'static [BlobSlot] {
        const WORKSPACE: &[BlobSlot] = &[BlobSlot {
            name: "workspace.json",
            folder: Folder::Projects,
        }];
        const SETTINGS: &[BlobSlot] = &[BlobSlot {
            name: "app-settings.json",
            folder: Folder::Settings,
        }];
        const EXTENSIONS: &[BlobSlot] = &[
            BlobSlot {
                name: "extensions-installed.json",
                folder: Folder::Extensions,
            },
            BlobSlot {
                name: "extensions-marketplace.json",
                folder: Folder::Extensions,
            },
        ];
        const SDK: &[BlobSlot] = &[
            BlobSlot {
                name: "sdk-state.json",
                folder: Folder::Sdks,
            },
            BlobSlot {
                name: "sdk-plugins.json",
                folder: Folder::Plugins,
            },
        ];
        match self {
            Self::Workspace => WORKSPACE,
            Self::Settings => SETTINGS,
            Self::Extensions => EXTENSIONS,
            Self::Sdk => SDK,
        }
    }

    /// Returns `true` for documents persisted file-by-file through a diff.
    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(self, Self::Workspace)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.key_prefix() == s)
            .ok_or_else(|| format!("unknown document kind: {s}"))
    }
}
