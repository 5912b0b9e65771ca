//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every entry leads
//! with its positional index and title, followed by where it ends up in the
//! site. Source paths are shown as secondary context via indented `Source:`
//! lines so the listing reads as a content inventory while still letting
//! users trace each entry back to a file.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Content
//! 001 Introduction → intro.html
//!     Source: 01-intro.md
//! 002 Guide → guide/index.html
//!     Source: 02-Guide
//!     001 install → guide/install.html
//!         Source: 02-Guide/01-install.md
//!     002 index → guide/index.html
//!         Source: 02-Guide/index.md
//!     003 My Diagram.png → guide/My-Diagram.png
//!         Source: 02-Guide/My Diagram.png
//!
//! 3 pages, 1 attachment
//! ```
//!
//! ## Diagnostics
//!
//! Grouped by page so every problem on a page is read together:
//!
//! ```text
//! intro
//!     broken link: `[[missing]]` does not match any page or attachment
//! notes
//!     ambiguous link: `[[topic]]` matches `a/topic`, `b/topic`; using `a/topic`
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::generate::{BuildMode, BuildReport};
use crate::naming::NodeKind;
use crate::tree::{ContentNode, ContentTree};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn plural(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// Where an entry ends up in the output, if anywhere.
fn destination(tree: &ContentTree, node: &ContentNode) -> Option<String> {
    match node.kind {
        NodeKind::Page => Some(format!("{}.html", node.output_path)),
        NodeKind::Attachment => Some(node.output_path.clone()),
        NodeKind::Folder => node
            .index
            .map(|i| format!("{}.html", tree.node(i).output_path)),
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the content tree as an indented inventory.
pub fn format_tree(tree: &ContentTree) -> Vec<String> {
    let mut lines = vec!["Content".to_string()];
    if tree.is_empty() {
        lines.push("    (empty)".to_string());
    }
    format_children(tree, tree.root(), 0, &mut lines);
    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(tree.page_count(), "page", "pages"),
        plural(tree.attachment_count(), "attachment", "attachments")
    ));
    lines
}

fn format_children(tree: &ContentTree, parent: &ContentNode, depth: usize, lines: &mut Vec<String>) {
    for (i, node) in tree.children(parent.id).enumerate() {
        let header = format!("{}{} {}", indent(depth), format_index(i + 1), node.title);
        match destination(tree, node) {
            Some(dest) => lines.push(format!("{header} \u{2192} {dest}")),
            None => lines.push(header),
        }
        lines.push(format!(
            "{}Source: {}",
            indent(depth + 1),
            node.source_path.to_string_lossy().replace('\\', "/")
        ));
        format_children(tree, node, depth + 1, lines);
    }
}

pub fn print_tree(tree: &ContentTree) {
    for line in format_tree(tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Format diagnostics grouped by page path.
pub fn format_diagnostics(diagnostics: &Diagnostics) -> Vec<String> {
    let mut lines = Vec::new();
    for (page, entries) in diagnostics.by_page() {
        lines.push(if page.is_empty() { "/" } else { page }.to_string());
        for d in entries {
            lines.push(format!("{}{}: {}", indent(1), d.kind.label(), d.detail));
        }
    }
    lines
}

pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for line in format_diagnostics(diagnostics) {
        println!("{}", line);
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Format the closing summary of a build or check.
pub fn format_summary(report: &BuildReport, mode: BuildMode, output: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    match mode {
        BuildMode::Write => lines.push(format!(
            "Built {}, copied {} \u{2192} {}",
            plural(report.pages_written, "page", "pages"),
            plural(report.attachments_copied, "attachment", "attachments"),
            output.display()
        )),
        BuildMode::Check => lines.push(format!(
            "Checked {}",
            plural(report.pages_checked, "page", "pages")
        )),
    }

    let diagnostics = &report.diagnostics;
    if diagnostics.is_empty() {
        lines.push("No problems found".to_string());
        return lines;
    }

    let kinds = [
        DiagnosticKind::PageFailed,
        DiagnosticKind::BrokenLink,
        DiagnosticKind::AmbiguousLink,
        DiagnosticKind::EmptyName,
    ];
    let counts: Vec<String> = kinds
        .iter()
        .filter_map(|&kind| match diagnostics.count(kind) {
            0 => None,
            n => Some(format!("{n} {}", kind.label())),
        })
        .collect();
    lines.push(format!(
        "{} ({})",
        plural(diagnostics.len(), "problem", "problems"),
        counts.join(", ")
    ));
    if report.strict && diagnostics.has_soft() {
        lines.push("Strict mode: warnings fail the build".to_string());
    }
    lines
}

pub fn print_summary(report: &BuildReport, mode: BuildMode, output: &Path) {
    for line in format_summary(report, mode, output) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
