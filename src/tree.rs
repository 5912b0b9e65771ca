//! Content tree assembly.
//!
//! Turns the flat directory listing produced by [`crate::scan`] into the
//! immutable [`ContentTree`] that every later stage reads from.
//!
//! ## Two Passes
//!
//! ```text
//! 1. Assemble (bottom-up)   entries → per-folder drafts, normalized + sorted
//! 2. Stamp    (top-down)    drafts  → arena nodes with output paths + parents
//! ```
//!
//! Sibling order and slugs must be final before any output path can be
//! computed, so the tree is only materialized once every folder has been
//! assembled. Slug collisions are detected during assembly and abort the
//! build before anything is stamped.
//!
//! ## Storage
//!
//! Nodes live in a flat `Vec<ContentNode>` addressed by [`NodeId`]. Parent
//! links are plain indices assigned once while stamping, so there are no
//! reference cycles and no interior mutability. The arena is filled in
//! pre-order, which makes arena order the document scan order used for
//! deterministic tie-breaks in link resolution.
//!
//! ## Ordering
//!
//! Children are sorted by [`OrderKey`] (numbers, then dates, then lexical),
//! ties broken by case-insensitive title, then by raw filename.

use crate::config::SiteConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::naming::{self, DateOrder, NodeKind, NormalizedName, OrderKey};
use crate::scan::ScanEntry;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("{} sibling slug collision(s); output would be overwritten", .0.len())]
    SlugCollision(Diagnostics),
}

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One file or folder of the content directory.
#[derive(Debug, Clone, Serialize)]
pub struct ContentNode {
    pub id: NodeId,
    /// Filename as found on disk. Empty for the root.
    pub raw_name: String,
    pub kind: NodeKind,
    pub order_key: OrderKey,
    /// Declared `# heading` for pages when present, otherwise from the filename.
    pub title: String,
    pub slug: String,
    /// Path from the site root without leading slash. Empty for the root.
    pub output_path: String,
    /// Path relative to the content root.
    pub source_path: PathBuf,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Child page acting as this folder's landing page.
    pub index: Option<NodeId>,
    pub depth: usize,
}

impl ContentNode {
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    pub fn is_page(&self) -> bool {
        self.kind == NodeKind::Page
    }
}

/// Settings the builder needs from the site config.
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Document extension without the dot.
    pub document_ext: String,
    /// Slug that marks a folder's landing page.
    pub index_name: String,
    pub date_order: DateOrder,
    pub root_title: String,
}

impl TreeOptions {
    pub fn from_site_config(config: &SiteConfig) -> Self {
        Self {
            document_ext: config.content.document_extension.clone(),
            index_name: config.content.index_name.clone(),
            date_order: config.content.date_order,
            root_title: config.site.title.clone(),
        }
    }
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self::from_site_config(&SiteConfig::default())
    }
}

/// The finished, read-only content tree of one build.
#[derive(Debug, Serialize)]
pub struct ContentTree {
    nodes: Vec<ContentNode>,
    #[serde(skip)]
    path_index: HashMap<String, NodeId>,
    #[serde(skip)]
    warnings: Vec<Diagnostic>,
}

/// A node before output paths are known.
struct Draft {
    raw_name: String,
    source_path: PathBuf,
    name: NormalizedName,
    slug: String,
    children: Vec<Draft>,
}

/// Accumulators threaded through assembly.
struct Assembly<'a> {
    listing: BTreeMap<PathBuf, Vec<(PathBuf, bool)>>,
    declared_titles: &'a HashMap<PathBuf, String>,
    options: &'a TreeOptions,
    warnings: Vec<Diagnostic>,
    collisions: Vec<Diagnostic>,
}

impl ContentTree {
    /// Build the tree from a directory listing.
    ///
    /// `entries` may come in any order; ancestor folders missing from the
    /// listing are filled in. `declared_titles` maps a page's relative source
    /// path to the first-level heading found in its content.
    pub fn build(
        entries: &[ScanEntry],
        declared_titles: &HashMap<PathBuf, String>,
        options: &TreeOptions,
    ) -> Result<ContentTree, TreeError> {
        let mut assembly = Assembly {
            listing: group_by_parent(entries),
            declared_titles,
            options,
            warnings: Vec::new(),
            collisions: Vec::new(),
        };

        let top_level = assembly.assemble(Path::new(""));
        if !assembly.collisions.is_empty() {
            return Err(TreeError::SlugCollision(assembly.collisions.into()));
        }

        let mut nodes = vec![ContentNode {
            id: NodeId(0),
            raw_name: String::new(),
            kind: NodeKind::Folder,
            order_key: OrderKey::Lexical(String::new()),
            title: options.root_title.clone(),
            slug: String::new(),
            output_path: String::new(),
            source_path: PathBuf::new(),
            parent: None,
            children: Vec::new(),
            index: None,
            depth: 0,
        }];
        stamp(NodeId(0), top_level, &mut nodes, &options.index_name);

        let path_index = nodes
            .iter()
            .map(|n| (n.output_path.clone(), n.id))
            .collect();

        Ok(ContentTree {
            nodes,
            path_index,
            warnings: assembly.warnings,
        })
    }

    pub fn root(&self) -> &ContentNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> &ContentNode {
        &self.nodes[id.0]
    }

    /// All nodes in document scan order, root first.
    pub fn nodes(&self) -> &[ContentNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the content directory had no entries at all.
    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &ContentNode> {
        self.nodes[id.0].children.iter().map(|&c| &self.nodes[c.0])
    }

    pub fn parent(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes[id.0].parent.map(|p| &self.nodes[p.0])
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.nodes[id.0].parent;
        while let Some(p) = current {
            out.push(p);
            current = self.nodes[p.0].parent;
        }
        out
    }

    pub fn find_by_path(&self, output_path: &str) -> Option<&ContentNode> {
        self.path_index.get(output_path).map(|&id| &self.nodes[id.0])
    }

    pub fn pages(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Page)
    }

    pub fn attachments(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Attachment)
    }

    pub fn page_count(&self) -> usize {
        self.pages().count()
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments().count()
    }

    /// Folder a node lives in; folders are their own folder.
    pub fn folder_of(&self, id: NodeId) -> NodeId {
        match self.nodes[id.0].kind {
            NodeKind::Folder => id,
            NodeKind::Page | NodeKind::Attachment => self.nodes[id.0].parent.unwrap_or(id),
        }
    }

    /// What a link to this node should point at: pages and attachments
    /// themselves, folders their index page. `None` for folders without one.
    pub fn link_target(&self, id: NodeId) -> Option<&ContentNode> {
        let node = &self.nodes[id.0];
        match node.kind {
            NodeKind::Page | NodeKind::Attachment => Some(node),
            NodeKind::Folder => node.index.map(|i| &self.nodes[i.0]),
        }
    }

    /// Number of edges on the path between two nodes.
    pub fn distance(&self, a: NodeId, b: NodeId) -> usize {
        let (mut a, mut b) = (a, b);
        let mut hops = 0;
        while self.nodes[a.0].depth > self.nodes[b.0].depth {
            a = self.nodes[a.0].parent.unwrap_or(a);
            hops += 1;
        }
        while self.nodes[b.0].depth > self.nodes[a.0].depth {
            b = self.nodes[b.0].parent.unwrap_or(b);
            hops += 1;
        }
        while a != b {
            match (self.nodes[a.0].parent, self.nodes[b.0].parent) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                    hops += 2;
                }
                _ => break,
            }
        }
        hops
    }

    /// Non-fatal issues found while building (placeholder slugs).
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

impl Assembly<'_> {
    fn assemble(&mut self, dir: &Path) -> Vec<Draft> {
        let Some(entries) = self.listing.get(dir).cloned() else {
            return Vec::new();
        };

        let mut drafts: Vec<Draft> = entries
            .into_iter()
            .map(|(path, is_dir)| self.draft(path, is_dir))
            .collect();

        let date_order = self.options.date_order;
        drafts.sort_by(|a, b| compare_siblings(a, b, date_order));

        let mut taken: HashSet<String> = drafts
            .iter()
            .filter(|d| d.name.slug.is_some())
            .map(|d| d.slug.clone())
            .collect();
        for (pos, draft) in drafts.iter_mut().enumerate() {
            if draft.name.slug.is_none() {
                let mut n = pos + 1;
                while taken.contains(&format!("untitled-{n}")) {
                    n += 1;
                }
                draft.slug = format!("untitled-{n}");
                taken.insert(draft.slug.clone());
                self.warnings.push(Diagnostic::new(
                    display_path(&draft.source_path),
                    DiagnosticKind::EmptyName,
                    format!(
                        "`{}` has no name after stripping its prefix; using `{}`",
                        draft.raw_name, draft.slug
                    ),
                ));
            }
        }

        self.detect_collisions(dir, &drafts);
        drafts
    }

    fn draft(&mut self, path: PathBuf, is_dir: bool) -> Draft {
        let raw_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut name = naming::normalize(&raw_name, is_dir, &self.options.document_ext);
        if name.kind == NodeKind::Page
            && let Some(declared) = self.declared_titles.get(&path)
            && !declared.trim().is_empty()
        {
            name.title = declared.trim().to_string();
        }
        let children = if is_dir {
            self.assemble(&path)
        } else {
            Vec::new()
        };
        Draft {
            slug: name.slug.clone().unwrap_or_default(),
            raw_name,
            source_path: path,
            name,
            children,
        }
    }

    /// Siblings collide when they claim the same name in the output folder.
    /// A page claims its slug (a folder of that name would shadow its links)
    /// and the `.html` file it is written to.
    fn detect_collisions(&mut self, dir: &Path, drafts: &[Draft]) {
        let mut claims: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for draft in drafts {
            let mut names = vec![draft.slug.clone()];
            if draft.name.kind == NodeKind::Page {
                names.push(format!("{}.html", draft.slug));
            }
            for name in names {
                claims.entry(name).or_default().push(draft.raw_name.as_str());
            }
        }

        let mut reported: HashSet<Vec<&str>> = HashSet::new();
        for (name, sources) in claims {
            if sources.len() > 1 && reported.insert(sources.clone()) {
                let listed = sources
                    .iter()
                    .map(|n| format!("`{n}`"))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.collisions.push(Diagnostic::new(
                    display_path(dir),
                    DiagnosticKind::SlugCollision,
                    format!("{listed} all normalize to `{name}`"),
                ));
            }
        }
    }
}

fn compare_siblings(a: &Draft, b: &Draft, date_order: DateOrder) -> Ordering {
    a.name
        .order_key
        .compare(&b.name.order_key, date_order)
        .then_with(|| naming::cmp_ignore_case(&a.name.title, &b.name.title))
        .then_with(|| a.raw_name.cmp(&b.raw_name))
}

/// Group entries by parent folder, filling in ancestors the listing skipped.
fn group_by_parent(entries: &[ScanEntry]) -> BTreeMap<PathBuf, Vec<(PathBuf, bool)>> {
    let mut all: BTreeMap<PathBuf, bool> = BTreeMap::new();
    for entry in entries {
        if entry.relative_path.as_os_str().is_empty() {
            continue;
        }
        all.entry(entry.relative_path.clone())
            .and_modify(|d| *d |= entry.is_dir)
            .or_insert(entry.is_dir);
        for ancestor in entry.relative_path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            all.insert(ancestor.to_path_buf(), true);
        }
    }

    let mut grouped: BTreeMap<PathBuf, Vec<(PathBuf, bool)>> = BTreeMap::new();
    for (path, is_dir) in all {
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        grouped.entry(parent).or_default().push((path, is_dir));
    }
    grouped
}

/// Attach drafts under `parent`, computing output paths and index pages.
fn stamp(parent: NodeId, drafts: Vec<Draft>, nodes: &mut Vec<ContentNode>, index_name: &str) {
    for draft in drafts {
        let id = NodeId(nodes.len());
        let (output_path, depth) = {
            let p = &nodes[parent.0];
            let path = if p.output_path.is_empty() {
                draft.slug.clone()
            } else {
                format!("{}/{}", p.output_path, draft.slug)
            };
            (path, p.depth + 1)
        };
        let is_index = draft.name.kind == NodeKind::Page && draft.slug == index_name;

        nodes.push(ContentNode {
            id,
            raw_name: draft.raw_name,
            kind: draft.name.kind,
            order_key: draft.name.order_key,
            title: draft.name.title,
            slug: draft.slug,
            output_path,
            source_path: draft.source_path,
            parent: Some(parent),
            children: Vec::new(),
            index: None,
            depth,
        });

        let parent_node = &mut nodes[parent.0];
        parent_node.children.push(id);
        if is_index && parent_node.index.is_none() {
            parent_node.index = Some(id);
        }

        stamp(id, draft.children, nodes, index_name);
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
