//! Shared test utilities for the folio test suite.
//!
//! Provides tree fixtures built from compact path lists, lookup helpers that
//! panic with the available choices on a miss, and a temp content directory
//! builder for filesystem tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! // Trailing slash marks a folder; ancestors are created implicitly.
//! let tree = build_tree(&["01-guide/", "01-guide/index.md", "about.md"]);
//!
//! let guide = find_node(&tree, "guide");
//! assert!(guide.has_index());
//! assert_eq!(child_titles(&tree, ""), vec!["guide", "about"]);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::scan::ScanEntry;
use crate::tree::{ContentNode, ContentTree, TreeOptions};

// =========================================================================
// Fixture setup
// =========================================================================

/// Turn `["dir/", "dir/page.md"]` into scan entries.
pub fn entries(paths: &[&str]) -> Vec<ScanEntry> {
    paths
        .iter()
        .map(|p| match p.strip_suffix('/') {
            Some(dir) => ScanEntry {
                relative_path: PathBuf::from(dir),
                is_dir: true,
            },
            None => ScanEntry {
                relative_path: PathBuf::from(p),
                is_dir: false,
            },
        })
        .collect()
}

/// Build a tree with default options and no declared titles.
pub fn build_tree(paths: &[&str]) -> ContentTree {
    ContentTree::build(&entries(paths), &HashMap::new(), &TreeOptions::default())
        .unwrap_or_else(|e| panic!("fixture tree failed to build: {e}"))
}

/// Write `(relative_path, contents)` pairs into a fresh temp directory.
pub fn setup_content(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = tmp.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, contents).unwrap();
    }
    tmp
}

// =========================================================================
// Tree lookups: panic with a clear message on miss
// =========================================================================

/// Find a node by output path. Panics if not found.
pub fn find_node<'a>(tree: &'a ContentTree, output_path: &str) -> &'a ContentNode {
    tree.find_by_path(output_path).unwrap_or_else(|| {
        let paths: Vec<&str> = tree.nodes().iter().map(|n| n.output_path.as_str()).collect();
        panic!("node '{output_path}' not found. Available: {paths:?}")
    })
}

/// Titles of a node's children in stored order.
pub fn child_titles<'a>(tree: &'a ContentTree, output_path: &str) -> Vec<&'a str> {
    let id = find_node(tree, output_path).id;
    tree.children(id).map(|n| n.title.as_str()).collect()
}

/// Slugs of a node's children in stored order.
pub fn child_slugs<'a>(tree: &'a ContentTree, output_path: &str) -> Vec<&'a str> {
    let id = find_node(tree, output_path).id;
    tree.children(id).map(|n| n.slug.as_str()).collect()
}
