//! Serialized workspace nodes.

use serde::{Deserialize, Serialize};

/// Path of the invisible workspace root.
pub const ROOT_PATH: &str = "/";

/// Whether a node holds content or children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A leaf with text content.
    File,
    /// A container of other nodes.
    Folder,
}

/// One node of the workspace tree in its persisted shape.
///
/// This is the `workspace.json` wire format: a recursive array of nodes.
/// Inside the engine the tree lives in a [`crate::FileTree`] arena instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Last path segment.
    pub name: String,
    /// Absolute path, the join of every ancestor name.
    pub path: String,
    /// File or folder.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// File content. Always absent on folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Folder children in display order. Always absent on files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
    /// Editor language hint for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl FileNode {
    /// A file node at `parent/name` with the language derived from its name.
    pub fn file(parent: &str, name: &str, content: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            path: join_path(parent, name),
            kind: NodeKind::File,
            content: Some(content.into()),
            children: None,
            language: Some(language_for(name).to_string()),
        }
    }

    /// A folder node at `parent/name`.
    pub fn folder(parent: &str, name: &str, children: Vec<FileNode>) -> Self {
        Self {
            name: name.to_string(),
            path: join_path(parent, name),
            kind: NodeKind::Folder,
            content: None,
            children: Some(children),
            language: None,
        }
    }
}

/// Joins a parent path and a child name. The root joins as `/name`.
#[must_use]
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Editor language for a file name, keyed on its extension.
#[must_use]
pub fn language_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" => "javascript",
        "json" => "json",
        "css" => "css",
        "scss" => "scss",
        "html" => "html",
        "md" => "markdown",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "yaml" | "yml" => "yaml",
        _ => "plaintext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_from_root() {
        assert_eq!(join_path("/", "src"), "/src");
        assert_eq!(join_path("", "src"), "/src");
        assert_eq!(join_path("/src", "lib.rs"), "/src/lib.rs");
    }

    #[test]
    fn language_by_extension() {
        assert_eq!(language_for("App.TSX"), "typescript");
        assert_eq!(language_for("main.rs"), "rust");
        assert_eq!(language_for("config.yml"), "yaml");
        assert_eq!(language_for("Makefile"), "plaintext");
        assert_eq!(language_for("archive.tar.gz"), "plaintext");
    }

    #[test]
    fn wire_shape_uses_type_field() {
        let node = FileNode::file("/", "README.md", "# hi");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["path"], "/README.md");
        assert_eq!(json["language"], "markdown");
        assert!(json.get("children").is_none());

        let folder = FileNode::folder("/", "src", Vec::new());
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["type"], "folder");
        assert!(json.get("content").is_none());
        assert_eq!(json["children"], serde_json::json!([]));
    }
}
