//! Filesystem scanning.
//!
//! Stage 1 of the build. Walks the content directory and produces the flat
//! `(relative_path, is_dir)` listing the tree builder consumes. Nothing is
//! interpreted here: naming conventions, ordering and slugs are all decided
//! later by [`crate::naming`] and [`crate::tree`].
//!
//! ## Directory Structure
//!
//! ```text
//! content/
//! ├── config.toml                  # Site configuration (skipped)
//! ├── index.md                     # Home page
//! ├── 0. Inbox.md                  # Page, ordering prefix 0
//! ├── 01-Guide/                    # Folder, ordering prefix 1
//! │   ├── index.md                 # Folder landing page
//! │   ├── 01-install.md
//! │   └── diagram.png              # Attachment
//! ├── journal/
//! │   ├── 2024-03-15-spring.md     # Date-ordered
//! │   └── 2023-12-01-winter.md
//! └── .obsidian/                   # Hidden (skipped)
//! ```
//!
//! Hidden entries (leading `.`), the root `config.toml`, and the output
//! directory when it lives inside the content root are skipped.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Content directory not found: {0}")]
    MissingRoot(PathBuf),
}

/// One entry of the content directory, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub relative_path: PathBuf,
    pub is_dir: bool,
}

/// Walk `root` and list every file and folder below it.
///
/// Entries come back sorted by path. `exclude` holds directories that must
/// not be listed (typically the build output).
pub fn scan_content(root: &Path, exclude: &[PathBuf]) -> Result<Vec<ScanEntry>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    let excluded: Vec<PathBuf> = exclude
        .iter()
        .map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.clone()))
        .collect();
    let canonical_root = fs::canonicalize(root)?;

    let mut entries = Vec::new();
    let walker = WalkDir::new(&canonical_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e, &canonical_root, &excluded));

    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&canonical_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        entries.push(ScanEntry {
            relative_path: relative,
            is_dir: entry.file_type().is_dir(),
        });
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

fn is_skipped(entry: &DirEntry, root: &Path, excluded: &[PathBuf]) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    if entry.depth() == 1 && name == "config.toml" {
        return true;
    }
    let path = entry.path();
    path != root && excluded.iter().any(|ex| path == ex.as_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_content;
    use tempfile::TempDir;

    fn listed(entries: &[ScanEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| {
                let p = e.relative_path.to_string_lossy().replace('\\', "/");
                if e.is_dir { format!("{p}/") } else { p }
            })
            .collect()
    }

    #[test]
    fn lists_files_and_folders_relative_to_root() {
        let tmp = setup_content(&[
            ("01-intro.md", "# Intro"),
            ("guide/index.md", "# Guide"),
            ("guide/diagram.png", "png"),
        ]);
        let entries = scan_content(tmp.path(), &[]).unwrap();
        assert_eq!(
            listed(&entries),
            vec!["01-intro.md", "guide/", "guide/diagram.png", "guide/index.md"]
        );
    }

    #[test]
    fn skips_hidden_entries_and_root_config() {
        let tmp = setup_content(&[
            ("config.toml", "[site]\ntitle = \"x\"\n"),
            (".obsidian/workspace.json", "{}"),
            (".DS_Store", ""),
            ("notes/config.toml", "kept"),
            ("page.md", "text"),
        ]);
        let entries = scan_content(tmp.path(), &[]).unwrap();
        assert_eq!(
            listed(&entries),
            vec!["notes/", "notes/config.toml", "page.md"]
        );
    }

    #[test]
    fn skips_excluded_output_directory() {
        let tmp = setup_content(&[("page.md", "text"), ("dist/page.html", "<p>")]);
        let entries = scan_content(tmp.path(), &[tmp.path().join("dist")]).unwrap();
        assert_eq!(listed(&entries), vec!["page.md"]);
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = scan_content(&tmp.path().join("nope"), &[]);
        assert!(matches!(result, Err(ScanError::MissingRoot(_))));
    }

    #[test]
    fn empty_directory_yields_no_entries() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_content(tmp.path(), &[]).unwrap().is_empty());
    }
}
