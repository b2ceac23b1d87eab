//! Property-based test generators using proptest.
//!
//! Provides strategies for generating documents and file sets that
//! satisfy the model's invariants.

use bytes::Bytes;
use proptest::prelude::*;
use worksync_engine::PushStrategy;
use worksync_model::{AppSettings, FileTree, NodeKind, WordWrap};

/// Strategy for generating file names with a known extension.
pub fn file_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,11}\\.(ts|tsx|md|json|rs|css)")
        .expect("Invalid regex")
}

/// Strategy for generating folder names.
pub fn folder_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for generating printable file content.
pub fn file_content_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~\n]{0,64}").expect("Invalid regex")
}

/// Strategy for generating a tree with root files and up to three
/// folders of files.
pub fn file_tree_strategy() -> impl Strategy<Value = FileTree> {
    let files = || prop::collection::btree_map(file_name_strategy(), file_content_strategy(), 0..6);
    (
        files(),
        prop::collection::btree_map(folder_name_strategy(), files(), 0..3),
    )
        .prop_map(|(root_files, folders)| {
            let mut tree = FileTree::new();
            for (name, content) in root_files {
                add_file(&mut tree, "/", &name, content);
            }
            for (folder, files) in folders {
                // A folder may share its name with a root file.
                let Ok(path) = tree.create("/", &folder, NodeKind::Folder) else {
                    continue;
                };
                for (name, content) in files {
                    add_file(&mut tree, &path, &name, content);
                }
            }
            tree
        })
}

fn add_file(tree: &mut FileTree, parent: &str, name: &str, content: String) {
    if let Ok(path) = tree.create(parent, name, NodeKind::File) {
        tree.write(&path, content).expect("Fresh file is writable");
    }
}

/// Strategy for generating a local file set with unique names.
pub fn local_files_strategy(max: usize) -> impl Strategy<Value = Vec<(String, Bytes)>> {
    prop::collection::btree_map(file_name_strategy(), file_content_strategy(), 0..max).prop_map(
        |files| {
            files
                .into_iter()
                .map(|(name, content)| (name, Bytes::from(content)))
                .collect()
        },
    )
}

/// Strategy for generating settings that differ from the defaults in a
/// few fields.
pub fn settings_strategy() -> impl Strategy<Value = AppSettings> {
    (8u32..40, 1u32..9, any::<bool>(), any::<bool>()).prop_map(
        |(font_size, tab_size, minimap, wrap)| {
            let mut settings = AppSettings::default();
            settings.editor.font_size = font_size;
            settings.editor.tab_size = tab_size;
            settings.editor.minimap = minimap;
            settings.editor.word_wrap = if wrap { WordWrap::On } else { WordWrap::Off };
            settings
        },
    )
}

/// Strategy for generating push strategies.
pub fn push_strategy_strategy() -> impl Strategy<Value = PushStrategy> {
    prop_oneof![
        Just(PushStrategy::Sequential),
        (1usize..8).prop_map(PushStrategy::Bounded),
        Just(PushStrategy::Unbounded),
    ]
}
