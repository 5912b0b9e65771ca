//! Build diagnostics: broken and ambiguous links, slug collisions, page
//! failures.
//!
//! Nothing here is global. Each page worker fills its own `Vec<Diagnostic>`
//! and the build driver merges them into a [`Diagnostics`] list once the
//! worker pool has drained. The merged list is sorted by page path so the
//! end-of-build report is stable across runs regardless of scheduling.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Reference matched nothing, or had no target at all.
    BrokenLink,
    /// Several equally good candidates; the best guess was used.
    AmbiguousLink,
    /// Two siblings normalize to the same slug. Fatal.
    SlugCollision,
    /// Filename was empty after stripping prefixes; a placeholder slug was used.
    EmptyName,
    /// A single page could not be produced.
    PageFailed,
}

impl DiagnosticKind {
    /// Soft diagnostics let the build finish with full output.
    pub fn is_soft(self) -> bool {
        matches!(
            self,
            DiagnosticKind::BrokenLink | DiagnosticKind::AmbiguousLink | DiagnosticKind::EmptyName
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            DiagnosticKind::BrokenLink => "broken link",
            DiagnosticKind::AmbiguousLink => "ambiguous link",
            DiagnosticKind::SlugCollision => "slug collision",
            DiagnosticKind::EmptyName => "empty name",
            DiagnosticKind::PageFailed => "page failed",
        }
    }
}

/// One recorded issue, attached to the page (or folder) it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Output path of the page the issue was found on. Empty for the root.
    pub page_path: String,
    pub kind: DiagnosticKind,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(page_path: impl Into<String>, kind: DiagnosticKind, detail: impl Into<String>) -> Self {
        Self {
            page_path: page_path.into(),
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page = if self.page_path.is_empty() {
            "/"
        } else {
            &self.page_path
        };
        write!(f, "{}: {}: {}", page, self.kind.label(), self.detail)
    }
}

/// Merged, sorted diagnostics for a whole build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge per-worker sinks and sort by page path, then kind, then detail.
    pub fn merge(sinks: impl IntoIterator<Item = Vec<Diagnostic>>) -> Self {
        let mut entries: Vec<Diagnostic> = sinks.into_iter().flatten().collect();
        entries.sort_by(|a, b| {
            (&a.page_path, a.kind, &a.detail).cmp(&(&b.page_path, b.kind, &b.detail))
        });
        Self { entries }
    }

    pub fn extend(&mut self, more: Diagnostics) {
        let merged = Self::merge([std::mem::take(&mut self.entries), more.entries]);
        self.entries = merged.entries;
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has_soft(&self) -> bool {
        self.entries.iter().any(|d| d.kind.is_soft())
    }

    pub fn has_hard(&self) -> bool {
        self.entries.iter().any(|d| !d.kind.is_soft())
    }

    /// Group by page path for the end-of-build report.
    pub fn by_page(&self) -> BTreeMap<&str, Vec<&Diagnostic>> {
        let mut grouped: BTreeMap<&str, Vec<&Diagnostic>> = BTreeMap::new();
        for d in &self.entries {
            grouped.entry(d.page_path.as_str()).or_default().push(d);
        }
        grouped
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(entries: Vec<Diagnostic>) -> Self {
        Self::merge([entries])
    }
}
