//! Wiki-link resolution.
//!
//! Authors cross-reference documents with bracket shorthand inside the
//! markdown. The renderer leaves those tokens in the HTML untouched; this
//! module finds them, resolves each against the finished [`ContentTree`] and
//! rewrites them into real links.
//!
//! ## Token Grammar
//!
//! ```text
//! [[target]]               link, label from the target's title
//! [[target|label]]         link with explicit label
//! [[target#anchor]]        link to a heading (anchor kept verbatim)
//! [[folder/target.md]]     folder segments narrow the match
//! ![[image.png]]           embed; images become <img>
//! ```
//!
//! ## Matching Tiers
//!
//! The first tier that produces any candidate wins:
//!
//! 1. **Exact path**: every segment normalized like a filename, looked up
//!    relative to the referencing page's folder. A leading `/` looks it up
//!    from the site root instead.
//! 2. **Slug**: the last segment's slug matched case-insensitively anywhere,
//!    leading folder segments required as a path suffix.
//! 3. **Title**: the raw target matched case-insensitively against titles.
//!    A target whose name has no slug at all (`[[🎉]]`) only tries this tier.
//!
//! A target carrying a non-document extension only matches attachments,
//! falling back to document matching when no attachment fits. Several
//! candidates in one tier go to the one closest in the tree; a remaining tie
//! goes to the first in scan order and is reported as ambiguous.
//!
//! A `#anchor` rides along unchanged: appended to the resolved URL, and kept
//! on the flagged link when the reference is broken.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::html::{code_ranges, decode_entities, tag_ranges};
use crate::naming::{self, NodeKind};
use crate::tree::{ContentNode, ContentTree, NodeId};
use maud::{Markup, html};
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\[\]\n]*?)\]\]").unwrap());

/// Everything but RFC 3986 unreserved characters is escaped inside a segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "bmp", "ico",
];

/// A parsed `[[...]]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    pub raw_target: String,
    pub alias: Option<String>,
    pub anchor: Option<String>,
    pub is_embed: bool,
}

/// A token occurrence in a page's HTML.
///
/// `token` is `None` for malformed references such as `[[]]` or `[[#x]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundToken {
    pub span: Range<usize>,
    pub token: Option<ReferenceToken>,
}

/// Split the inside of a `[[...]]` into target, anchor and alias.
///
/// The alias is split off at the first `|`, then the anchor at the first
/// `#`. Returns `None` when no target remains.
pub fn parse_token(inner: &str, is_embed: bool) -> Option<ReferenceToken> {
    let inner = decode_entities(inner);
    let (reference, alias) = match inner.split_once('|') {
        Some((reference, alias)) => (reference, Some(alias)),
        None => (inner.as_str(), None),
    };
    let (target, anchor) = match reference.split_once('#') {
        Some((target, anchor)) => (target, Some(anchor)),
        None => (reference, None),
    };
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    Some(ReferenceToken {
        raw_target: target.to_string(),
        alias: non_empty(alias),
        anchor: non_empty(anchor),
        is_embed,
    })
}

fn non_empty(part: Option<&str>) -> Option<String> {
    part.map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Every `[[...]]` and `![[...]]` in text, skipping `<code>` and `<pre>`
/// elements and the inside of tags (attribute values such as `alt`).
pub fn find_tokens(html: &str) -> Vec<FoundToken> {
    let mut protected = code_ranges(html);
    protected.extend(tag_ranges(html));
    TOKEN_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if protected.iter().any(|r| r.contains(&whole.start())) {
                return None;
            }
            let is_embed = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let inner = caps.get(2).map_or("", |m| m.as_str());
            Some(FoundToken {
                span: whole.range(),
                token: parse_token(inner, is_embed),
            })
        })
        .collect()
}

/// Outcome of resolving one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedLink),
    Broken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub target: NodeId,
    pub kind: NodeKind,
    pub output_path: String,
    pub title: String,
    pub anchor: Option<String>,
}

impl ResolvedLink {
    pub fn href(&self, base_url: &str) -> String {
        let mut href = match self.kind {
            NodeKind::Page => page_url(base_url, &self.output_path),
            NodeKind::Attachment | NodeKind::Folder => site_url(base_url, &self.output_path),
        };
        if let Some(anchor) = &self.anchor {
            href.push('#');
            href.push_str(&encode_fragment(anchor));
        }
        href
    }
}

/// URL of a generated page.
pub fn page_url(base_url: &str, output_path: &str) -> String {
    site_url(base_url, &format!("{output_path}.html"))
}

/// Absolute URL of an output path under `base_url`.
pub fn site_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), encode_path(path))
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_fragment(anchor: &str) -> String {
    utf8_percent_encode(anchor, FRAGMENT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    Document,
    Attachment,
}

/// A target split into normalized path segments.
struct Target {
    /// Raw text of the last segment, document extension removed.
    last_raw: String,
    /// Normalized segments; `..` kept as is. The last one is empty when the
    /// name has nothing a slug can be made of.
    slugs: Vec<String>,
    from_root: bool,
    want: Want,
}

/// Resolves reference tokens against one tree.
///
/// Built once per build and shared read-only by every page worker.
pub struct Resolver<'a> {
    tree: &'a ContentTree,
    document_ext: String,
    base_url: String,
    by_slug: HashMap<String, Vec<NodeId>>,
    by_title: HashMap<String, Vec<NodeId>>,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a ContentTree, document_ext: &str, base_url: &str) -> Self {
        let mut by_slug: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut by_title: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in tree.nodes().iter().skip(1) {
            by_slug.entry(node.slug.to_lowercase()).or_default().push(node.id);
            by_title.entry(node.title.to_lowercase()).or_default().push(node.id);
        }
        Self {
            tree,
            document_ext: document_ext.to_string(),
            base_url: base_url.to_string(),
            by_slug,
            by_title,
        }
    }

    /// Resolve `token` as referenced from page `from`.
    ///
    /// Broken and ambiguous references are pushed onto `sink`.
    pub fn resolve(
        &self,
        token: &ReferenceToken,
        from: NodeId,
        sink: &mut Vec<Diagnostic>,
    ) -> Resolution {
        let page_path = &self.tree.node(from).output_path;
        let Some(target) = self.analyze(&token.raw_target, false) else {
            sink.push(broken(page_path, token));
            return Resolution::Broken;
        };

        let mut candidates = self.match_tiers(&target, from);
        if candidates.is_empty()
            && target.want == Want::Attachment
            && let Some(as_document) = self.analyze(&token.raw_target, true)
        {
            candidates = self.match_tiers(&as_document, from);
        }

        match self.pick(candidates, from, token, sink) {
            Some(id) => {
                let node = self.tree.node(id);
                Resolution::Resolved(ResolvedLink {
                    target: id,
                    kind: node.kind,
                    output_path: node.output_path.clone(),
                    title: node.title.clone(),
                    anchor: token.anchor.clone(),
                })
            }
            None => {
                sink.push(broken(page_path, token));
                Resolution::Broken
            }
        }
    }

    /// Split and normalize a raw target. `whole_name` keeps any extension as
    /// part of the name, for the document fallback of attachment targets.
    fn analyze(&self, raw: &str, whole_name: bool) -> Option<Target> {
        let cleaned = raw.trim().replace('\\', "/");
        let from_root = cleaned.starts_with('/');
        let mut segments: Vec<&str> = cleaned
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let last = segments.pop()?;

        let (last_raw, want) = match naming::split_extension(last) {
            Some((stem, ext)) if ext.eq_ignore_ascii_case(&self.document_ext) => {
                (stem, Want::Document)
            }
            Some(_) if !whole_name => (last, Want::Attachment),
            _ => (last, Want::Document),
        };

        let mut slugs = Vec::with_capacity(segments.len() + 1);
        for segment in segments {
            if segment == ".." {
                slugs.push("..".to_string());
            } else {
                slugs.push(naming::normalize(segment, true, &self.document_ext).slug?);
            }
        }
        if last_raw.trim().is_empty() {
            return None;
        }
        slugs.push(match want {
            Want::Attachment => naming::attachment_slug(last_raw),
            Want::Document => naming::normalize(last_raw, true, &self.document_ext)
                .slug
                .unwrap_or_default(),
        });

        Some(Target {
            last_raw: last_raw.to_string(),
            slugs,
            from_root,
            want,
        })
    }

    fn match_tiers(&self, target: &Target, from: NodeId) -> Vec<NodeId> {
        if target.slugs.last().is_none_or(|s| s.is_empty()) {
            return self.title_matches(target);
        }
        let exact = self.exact_path(target, from);
        if !exact.is_empty() || target.slugs.iter().any(|s| s == "..") {
            return exact;
        }
        let by_slug = self.slug_matches(target);
        if !by_slug.is_empty() {
            return by_slug;
        }
        self.title_matches(target)
    }

    /// Tier 1: the normalized path under the page's folder, or under the
    /// root for `/`-prefixed targets.
    fn exact_path(&self, target: &Target, from: NodeId) -> Vec<NodeId> {
        let base = if target.from_root {
            ""
        } else {
            self.tree.node(self.tree.folder_of(from)).output_path.as_str()
        };
        join_segments(base, &target.slugs)
            .and_then(|path| self.tree.find_by_path(&path))
            .and_then(|node| self.accept(node, target.want))
            .into_iter()
            .collect()
    }

    /// Tier 2: last slug anywhere, folder segments as path suffix.
    fn slug_matches(&self, target: &Target) -> Vec<NodeId> {
        let Some(last) = target.slugs.last() else {
            return Vec::new();
        };
        let folders = &target.slugs[..target.slugs.len() - 1];
        self.collect(self.by_slug.get(&last.to_lowercase()), folders, target.want)
    }

    /// Tier 3: raw last segment against titles.
    fn title_matches(&self, target: &Target) -> Vec<NodeId> {
        let folders = &target.slugs[..target.slugs.len().saturating_sub(1)];
        let key = target.last_raw.trim().to_lowercase();
        self.collect(self.by_title.get(&key), folders, target.want)
    }

    fn collect(&self, ids: Option<&Vec<NodeId>>, folders: &[String], want: Want) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = ids
            .into_iter()
            .flatten()
            .map(|&id| self.tree.node(id))
            .filter(|node| self.under_folders(node, folders))
            .filter_map(|node| self.accept(node, want))
            .collect();
        found.sort();
        found.dedup();
        found
    }

    /// True when the node's parent path ends with the given folder slugs.
    fn under_folders(&self, node: &ContentNode, folders: &[String]) -> bool {
        if folders.is_empty() {
            return true;
        }
        let suffix = folders.join("/").to_lowercase();
        let parent = self
            .tree
            .parent(node.id)
            .map(|p| p.output_path.to_lowercase())
            .unwrap_or_default();
        parent == suffix || parent.ends_with(&format!("/{suffix}"))
    }

    /// Map a matched node to what the link should point at.
    fn accept(&self, node: &ContentNode, want: Want) -> Option<NodeId> {
        match (node.kind, want) {
            (NodeKind::Page, Want::Document) => Some(node.id),
            (NodeKind::Folder, Want::Document) => node.index,
            (NodeKind::Attachment, Want::Attachment) => Some(node.id),
            (NodeKind::Page | NodeKind::Folder, Want::Attachment)
            | (NodeKind::Attachment, Want::Document) => None,
        }
    }

    fn pick(
        &self,
        candidates: Vec<NodeId>,
        from: NodeId,
        token: &ReferenceToken,
        sink: &mut Vec<Diagnostic>,
    ) -> Option<NodeId> {
        if candidates.len() <= 1 {
            return candidates.first().copied();
        }
        let nearest = candidates
            .iter()
            .map(|&id| self.tree.distance(from, id))
            .min()?;
        let closest: Vec<NodeId> = candidates
            .into_iter()
            .filter(|&id| self.tree.distance(from, id) == nearest)
            .collect();
        let chosen = *closest.first()?;
        if closest.len() > 1 {
            let listed = closest
                .iter()
                .map(|&id| format!("`{}`", self.tree.node(id).output_path))
                .collect::<Vec<_>>()
                .join(", ");
            sink.push(Diagnostic::new(
                self.tree.node(from).output_path.clone(),
                DiagnosticKind::AmbiguousLink,
                format!(
                    "`[[{}]]` matches {listed}; using `{}`",
                    token.raw_target,
                    self.tree.node(chosen).output_path
                ),
            ));
        }
        Some(chosen)
    }

    /// Replace every token in `html` with its rendered link.
    ///
    /// Malformed tokens stay as written. Problems are pushed onto `sink`.
    pub fn rewrite_html(&self, html: &str, from: NodeId, sink: &mut Vec<Diagnostic>) -> String {
        let found = find_tokens(html);
        if found.is_empty() {
            return html.to_string();
        }

        let page_path = &self.tree.node(from).output_path;
        let mut out = String::with_capacity(html.len());
        let mut cursor = 0;
        for FoundToken { span, token } in found {
            out.push_str(&html[cursor..span.start]);
            let literal = &html[span.clone()];
            match token {
                None => {
                    sink.push(Diagnostic::new(
                        page_path.clone(),
                        DiagnosticKind::BrokenLink,
                        format!("malformed reference `{}`", decode_entities(literal)),
                    ));
                    out.push_str(literal);
                }
                Some(token) => {
                    let markup = match self.resolve(&token, from, sink) {
                        Resolution::Resolved(link) => self.render_link(&token, &link),
                        Resolution::Broken => render_broken(&token),
                    };
                    out.push_str(&markup.into_string());
                }
            }
            cursor = span.end;
        }
        out.push_str(&html[cursor..]);
        out
    }

    fn render_link(&self, token: &ReferenceToken, link: &ResolvedLink) -> Markup {
        let href = link.href(&self.base_url);
        let label = token.alias.as_deref().unwrap_or(&link.title);
        if token.is_embed && link.kind == NodeKind::Attachment && is_image(&link.output_path) {
            return html! {
                img.wikilink-embed src=(href) alt=(label);
            };
        }
        html! {
            a.wikilink href=(href) { (label) }
        }
    }
}

fn render_broken(token: &ReferenceToken) -> Markup {
    let label = token.alias.as_deref().unwrap_or(&token.raw_target);
    let (href, wanted) = match &token.anchor {
        Some(anchor) => (
            Some(format!("#{}", encode_fragment(anchor))),
            format!("{}#{anchor}", token.raw_target),
        ),
        None => (None, token.raw_target.clone()),
    };
    html! {
        a.wikilink.broken href=[href] title={ "Unresolved: " (wanted) } { (label) }
    }
}

fn broken(page_path: &str, token: &ReferenceToken) -> Diagnostic {
    Diagnostic::new(
        page_path,
        DiagnosticKind::BrokenLink,
        format!("`[[{}]]` does not match any page or attachment", token.raw_target),
    )
}

fn is_image(path: &str) -> bool {
    naming::split_extension(path).is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Join normalized segments onto `base`, applying `..`.
fn join_segments(base: &str, slugs: &[String]) -> Option<String> {
    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for slug in slugs {
        if slug == ".." {
            parts.pop()?;
        } else {
            parts.push(slug);
        }
    }
    Some(parts.join("/"))
}
