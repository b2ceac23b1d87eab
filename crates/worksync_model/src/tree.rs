//! Arena-backed workspace tree.
//!
//! The tree is stored flat: every node lives in one table keyed by its
//! path, and structure is kept as parent/child path lists. Edits touch only
//! the affected entries instead of rebuilding nested vectors.

use crate::error::{ModelError, ModelResult};
use crate::node::{join_path, language_for, FileNode, NodeKind, ROOT_PATH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    kind: NodeKind,
    content: Option<String>,
    language: Option<String>,
    parent: Option<String>,
    children: Vec<String>,
}

/// The workspace file tree.
///
/// # Invariants
///
/// - Paths are unique and equal the join of ancestor names
/// - Folders carry children and never content
/// - Files carry content (possibly empty) and never children
///
/// Serializes as the recursive `workspace.json` node array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FileNode>", into = "Vec<FileNode>")]
pub struct FileTree {
    entries: HashMap<String, Entry>,
    roots: Vec<String>,
}

impl FileTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from nested nodes, validating every invariant.
    ///
    /// Files saved without content load as empty files.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTree`] on a duplicate or mismatched
    /// path, a folder with content, or a file with children.
    pub fn from_nodes(nodes: Vec<FileNode>) -> ModelResult<Self> {
        let mut tree = Self::new();
        for node in nodes {
            let path = tree.insert_node(None, node)?;
            tree.roots.push(path);
        }
        Ok(tree)
    }

    fn insert_node(&mut self, parent: Option<&str>, node: FileNode) -> ModelResult<String> {
        validate_name(&node.name)
            .map_err(|_| ModelError::InvalidTree(format!("bad node name {:?}", node.name)))?;
        let expected = join_path(parent.unwrap_or(ROOT_PATH), &node.name);
        if node.path != expected {
            return Err(ModelError::InvalidTree(format!(
                "node path {} does not match expected {expected}",
                node.path
            )));
        }
        if self.entries.contains_key(&expected) {
            return Err(ModelError::InvalidTree(format!("duplicate path {expected}")));
        }

        let (content, children) = match node.kind {
            NodeKind::File => {
                if node.children.is_some() {
                    return Err(ModelError::InvalidTree(format!(
                        "file {expected} has children"
                    )));
                }
                (Some(node.content.unwrap_or_default()), Vec::new())
            }
            NodeKind::Folder => {
                if node.content.is_some() {
                    return Err(ModelError::InvalidTree(format!(
                        "folder {expected} has content"
                    )));
                }
                (None, node.children.unwrap_or_default())
            }
        };

        self.entries.insert(
            expected.clone(),
            Entry {
                name: node.name,
                kind: node.kind,
                content,
                language: node.language,
                parent: parent.map(str::to_string),
                children: Vec::new(),
            },
        );
        for child in children {
            let child_path = self.insert_node(Some(&expected), child)?;
            if let Some(entry) = self.entries.get_mut(&expected) {
                entry.children.push(child_path);
            }
        }
        Ok(expected)
    }

    /// Nested nodes in display order.
    #[must_use]
    pub fn to_nodes(&self) -> Vec<FileNode> {
        self.roots.iter().filter_map(|p| self.node(p)).collect()
    }

    /// Rebuilds the node at `path` with its whole subtree.
    #[must_use]
    pub fn node(&self, path: &str) -> Option<FileNode> {
        let entry = self.entries.get(path)?;
        let children = match entry.kind {
            NodeKind::File => None,
            NodeKind::Folder => Some(
                entry
                    .children
                    .iter()
                    .filter_map(|c| self.node(c))
                    .collect(),
            ),
        };
        Some(FileNode {
            name: entry.name.clone(),
            path: path.to_string(),
            kind: entry.kind,
            content: entry.content.clone(),
            children,
            language: entry.language.clone(),
        })
    }

    /// Kind of the node at `path`.
    #[must_use]
    pub fn kind(&self, path: &str) -> Option<NodeKind> {
        self.entries.get(path).map(|e| e.kind)
    }

    /// Content of the file at `path`.
    #[must_use]
    pub fn content(&self, path: &str) -> Option<&str> {
        self.entries.get(path)?.content.as_deref()
    }

    /// Returns `true` if a node exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Paths of the direct children of `path` (`/` for top-level nodes).
    #[must_use]
    pub fn children(&self, path: &str) -> Option<&[String]> {
        if path == ROOT_PATH {
            return Some(&self.roots);
        }
        let entry = self.entries.get(path)?;
        (entry.kind == NodeKind::Folder).then_some(entry.children.as_slice())
    }

    /// Creates an empty file or folder named `name` under `parent`.
    ///
    /// Returns the new node's path.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid, the parent is missing or not a folder,
    /// or the path is taken.
    pub fn create(&mut self, parent: &str, name: &str, kind: NodeKind) -> ModelResult<String> {
        validate_name(name)?;
        let is_root = parent.is_empty() || parent == ROOT_PATH;
        if !is_root {
            match self.entries.get(parent) {
                None => return Err(ModelError::NotFound(parent.to_string())),
                Some(e) if e.kind != NodeKind::Folder => {
                    return Err(ModelError::NotAFolder(parent.to_string()))
                }
                Some(_) => {}
            }
        }
        let path = join_path(parent, name);
        if self.entries.contains_key(&path) {
            return Err(ModelError::AlreadyExists(path));
        }

        let (content, language) = match kind {
            NodeKind::File => (Some(String::new()), Some(language_for(name).to_string())),
            NodeKind::Folder => (None, None),
        };
        self.entries.insert(
            path.clone(),
            Entry {
                name: name.to_string(),
                kind,
                content,
                language,
                parent: (!is_root).then(|| parent.to_string()),
                children: Vec::new(),
            },
        );
        if is_root {
            self.roots.push(path.clone());
        } else if let Some(entry) = self.entries.get_mut(parent) {
            entry.children.push(path.clone());
        }
        Ok(path)
    }

    /// Replaces the content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if no node exists at `path` or it is a folder.
    pub fn write(&mut self, path: &str, content: impl Into<String>) -> ModelResult<()> {
        let entry = self
            .entries
            .get_mut(path)
            .ok_or_else(|| ModelError::NotFound(path.to_string()))?;
        if entry.kind != NodeKind::File {
            return Err(ModelError::NotAFile(path.to_string()));
        }
        entry.content = Some(content.into());
        Ok(())
    }

    /// Removes the node at `path` and everything below it.
    ///
    /// Returns the number of nodes removed.
    ///
    /// # Errors
    ///
    /// Fails if no node exists at `path`.
    pub fn remove(&mut self, path: &str) -> ModelResult<usize> {
        let parent = self
            .entries
            .get(path)
            .ok_or_else(|| ModelError::NotFound(path.to_string()))?
            .parent
            .clone();
        let doomed = self.subtree(path);
        for p in &doomed {
            self.entries.remove(p);
        }
        let siblings = match parent {
            Some(parent) => self.entries.get_mut(&parent).map(|e| &mut e.children),
            None => Some(&mut self.roots),
        };
        if let Some(siblings) = siblings {
            siblings.retain(|p| p != path);
        }
        Ok(doomed.len())
    }

    /// Renames the node at `path`, re-keying its whole subtree.
    ///
    /// A renamed file gets a fresh language hint. Returns the new path.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid, no node exists at `path`, or a sibling
    /// already uses the name.
    pub fn rename(&mut self, path: &str, new_name: &str) -> ModelResult<String> {
        validate_name(new_name)?;
        let parent = self
            .entries
            .get(path)
            .ok_or_else(|| ModelError::NotFound(path.to_string()))?
            .parent
            .clone();
        let new_path = join_path(parent.as_deref().unwrap_or(ROOT_PATH), new_name);
        if new_path == path {
            return Ok(new_path);
        }
        if self.entries.contains_key(&new_path) {
            return Err(ModelError::AlreadyExists(new_path));
        }

        let in_subtree = |p: &str| p == path || p.starts_with(&format!("{path}/"));
        let rebase = |p: &str| format!("{new_path}{}", &p[path.len()..]);

        for old in self.subtree(path) {
            let Some(mut entry) = self.entries.remove(&old) else {
                continue;
            };
            if old == path {
                entry.name = new_name.to_string();
                if entry.kind == NodeKind::File {
                    entry.language = Some(language_for(new_name).to_string());
                }
            } else {
                entry.parent = entry
                    .parent
                    .map(|p| if in_subtree(&p) { rebase(&p) } else { p });
            }
            entry.children = entry.children.iter().map(|c| rebase(c)).collect();
            self.entries.insert(rebase(&old), entry);
        }

        let siblings = match &parent {
            Some(parent) => self.entries.get_mut(parent).map(|e| &mut e.children),
            None => Some(&mut self.roots),
        };
        if let Some(siblings) = siblings {
            for p in siblings.iter_mut().filter(|p| p.as_str() == path) {
                p.clone_from(&new_path);
            }
        }
        Ok(new_path)
    }

    /// Every file as `(path, content)`, depth-first in display order.
    #[must_use]
    pub fn files(&self) -> Vec<(String, String)> {
        self.paths()
            .into_iter()
            .filter_map(|p| {
                let content = self.entries.get(&p)?.content.clone()?;
                Some((p, content))
            })
            .collect()
    }

    /// Every path, depth-first in display order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.roots.iter().flat_map(|r| self.subtree(r)).collect()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn subtree(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![path.to_string()];
        while let Some(p) = stack.pop() {
            if let Some(entry) = self.entries.get(&p) {
                stack.extend(entry.children.iter().rev().cloned());
                out.push(p);
            }
        }
        out
    }
}

impl TryFrom<Vec<FileNode>> for FileTree {
    type Error = ModelError;

    fn try_from(nodes: Vec<FileNode>) -> Result<Self, Self::Error> {
        Self::from_nodes(nodes)
    }
}

impl From<FileTree> for Vec<FileNode> {
    fn from(tree: FileTree) -> Self {
        tree.to_nodes()
    }
}

fn validate_name(name: &str) -> ModelResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(ModelError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> FileTree {
        FileTree::from_nodes(vec![
            FileNode::folder(
                "/",
                "src",
                vec![
                    FileNode::file("/src", "main.ts", "run()"),
                    FileNode::folder(
                        "/src",
                        "util",
                        vec![FileNode::file("/src/util", "fmt.ts", "fmt()")],
                    ),
                ],
            ),
            FileNode::file("/", "README.md", "# demo"),
        ])
        .unwrap()
    }

    #[test]
    fn nodes_round_trip_in_order() {
        let tree = sample();
        let nodes = tree.to_nodes();
        assert_eq!(nodes[0].name, "src");
        assert_eq!(nodes[1].name, "README.md");
        assert_eq!(FileTree::from_nodes(nodes).unwrap(), tree);
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let err = FileTree::from_nodes(vec![
            FileNode::file("/", "a.txt", ""),
            FileNode::file("/", "a.txt", ""),
        ])
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTree(_)));
    }

    #[test]
    fn mismatched_path_is_rejected() {
        let mut node = FileNode::file("/", "a.txt", "");
        node.path = "/elsewhere/a.txt".into();
        assert!(FileTree::from_nodes(vec![node]).is_err());
    }

    #[test]
    fn folder_with_content_is_rejected() {
        let mut node = FileNode::folder("/", "src", vec![]);
        node.content = Some("x".into());
        assert!(FileTree::from_nodes(vec![node]).is_err());
    }

    #[test]
    fn file_without_content_loads_empty() {
        let mut node = FileNode::file("/", "a.txt", "");
        node.content = None;
        let tree = FileTree::from_nodes(vec![node]).unwrap();
        assert_eq!(tree.content("/a.txt"), Some(""));
    }

    #[test]
    fn files_are_flattened_depth_first() {
        let files = sample().files();
        let paths: Vec<_> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["/src/main.ts", "/src/util/fmt.ts", "/README.md"]);
    }

    #[test]
    fn create_under_folder_and_root() {
        let mut tree = sample();
        let path = tree.create("/src", "lib.rs", NodeKind::File).unwrap();
        assert_eq!(path, "/src/lib.rs");
        assert_eq!(tree.content(&path), Some(""));
        assert_eq!(tree.node(&path).unwrap().language.as_deref(), Some("rust"));

        let root = tree.create("/", "docs", NodeKind::Folder).unwrap();
        assert_eq!(root, "/docs");
        assert_eq!(tree.children("/").unwrap().last().unwrap(), "/docs");
    }

    #[test]
    fn create_rejects_bad_parents() {
        let mut tree = sample();
        assert!(matches!(
            tree.create("/README.md", "x", NodeKind::File),
            Err(ModelError::NotAFolder(_))
        ));
        assert!(matches!(
            tree.create("/missing", "x", NodeKind::File),
            Err(ModelError::NotFound(_))
        ));
        assert!(matches!(
            tree.create("/src", "main.ts", NodeKind::File),
            Err(ModelError::AlreadyExists(_))
        ));
        assert!(matches!(
            tree.create("/src", "a/b", NodeKind::File),
            Err(ModelError::InvalidName(_))
        ));
    }

    #[test]
    fn write_only_targets_files() {
        let mut tree = sample();
        tree.write("/README.md", "# changed").unwrap();
        assert_eq!(tree.content("/README.md"), Some("# changed"));
        assert!(matches!(
            tree.write("/src", "x"),
            Err(ModelError::NotAFile(_))
        ));
    }

    #[test]
    fn remove_drops_subtree() {
        let mut tree = sample();
        assert_eq!(tree.remove("/src").unwrap(), 4);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.paths(), vec!["/README.md"]);
        assert!(tree.remove("/src").is_err());
    }

    #[test]
    fn rename_rekeys_subtree() {
        let mut tree = sample();
        let new_path = tree.rename("/src", "source").unwrap();
        assert_eq!(new_path, "/source");
        assert!(!tree.contains("/src/util/fmt.ts"));
        assert_eq!(tree.content("/source/util/fmt.ts"), Some("fmt()"));
        assert_eq!(tree.paths()[0], "/source");

        let nodes = tree.to_nodes();
        assert!(FileTree::from_nodes(nodes).is_ok());
    }

    #[test]
    fn rename_refreshes_language() {
        let mut tree = sample();
        let p = tree.rename("/src/main.ts", "main.py").unwrap();
        assert_eq!(tree.node(&p).unwrap().language.as_deref(), Some("python"));
        assert!(matches!(
            tree.rename("/src/main.py", "util"),
            Err(ModelError::AlreadyExists(_))
        ));
    }

    #[test]
    fn serde_uses_node_array() {
        let tree = sample();
        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.starts_with("[{\"name\":\"src\""));
        let back: FileTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }

    proptest! {
        #[test]
        fn created_paths_stay_consistent(names in proptest::collection::vec("[a-z]{1,6}", 1..20)) {
            let mut tree = FileTree::new();
            let mut folders = vec![ROOT_PATH.to_string()];
            for (i, name) in names.iter().enumerate() {
                let parent = folders[i % folders.len()].clone();
                let kind = if i % 3 == 0 { NodeKind::Folder } else { NodeKind::File };
                if let Ok(path) = tree.create(&parent, name, kind) {
                    if kind == NodeKind::Folder {
                        folders.push(path);
                    }
                }
            }
            let rebuilt = FileTree::from_nodes(tree.to_nodes()).unwrap();
            prop_assert_eq!(rebuilt.len(), tree.len());
            prop_assert_eq!(rebuilt, tree);
        }
    }
}
