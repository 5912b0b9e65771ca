//! Per-page heading outline.
//!
//! Reads a page's rendered HTML, collects the `h2`–`h4` headings that carry
//! an `id`, and nests them into a forest for the table of contents:
//!
//! ```text
//! h2 Setup            Setup
//! h2 Usage            Usage
//! h3 Flags     →        ├── Flags
//! h3 Config             └── Config
//! h2 FAQ              FAQ
//! ```
//!
//! Headings without an `id` cannot be linked to and are ignored. Pages with
//! fewer than `min_headings` qualifying headings get no outline at all.

use crate::html::{decode_entities, strip_tags};
use maud::{Markup, html};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([2-4])(\s[^>]*)?>(.*?)</h([2-6])\s*>").unwrap()
});

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

pub const DEFAULT_MIN_HEADINGS: usize = 3;

/// One entry of the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingNode {
    pub id: String,
    pub text: String,
    pub level: u8,
    pub children: Vec<HeadingNode>,
}

/// Collect linkable headings from `html` and nest them by level.
///
/// Returns an empty forest when fewer than `min_headings` headings qualify.
pub fn extract_outline(html: &str, min_headings: usize) -> Vec<HeadingNode> {
    let flat = collect_headings(html);
    if flat.is_empty() || flat.len() < min_headings {
        return Vec::new();
    }
    nest(flat)
}

fn collect_headings(html: &str) -> Vec<HeadingNode> {
    HEADING_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let open = caps.get(1)?.as_str();
            if caps.get(4)?.as_str() != open {
                return None;
            }
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            let id_caps = ID_RE.captures(attrs)?;
            let id = id_caps
                .get(1)
                .or_else(|| id_caps.get(2))
                .or_else(|| id_caps.get(3))?
                .as_str();
            if id.is_empty() {
                return None;
            }
            let text = heading_text(caps.get(3).map_or("", |m| m.as_str()));
            Some(HeadingNode {
                id: decode_entities(id),
                text,
                level: open.parse().ok()?,
                children: Vec::new(),
            })
        })
        .collect()
}

fn heading_text(inner: &str) -> String {
    decode_entities(&strip_tags(inner))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stack-based nesting: a heading becomes the child of the nearest open
/// heading with a strictly lower level.
fn nest(flat: Vec<HeadingNode>) -> Vec<HeadingNode> {
    let mut roots = Vec::new();
    let mut stack: Vec<HeadingNode> = Vec::new();

    for heading in flat {
        while stack.last().is_some_and(|top| top.level >= heading.level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(heading);
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }
    roots
}

fn close_top(stack: &mut Vec<HeadingNode>, roots: &mut Vec<HeadingNode>) {
    if let Some(done) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}

/// Render the outline as a nested list of in-page links.
pub fn render_toc(outline: &[HeadingNode]) -> Markup {
    if outline.is_empty() {
        return html! {};
    }
    html! {
        nav.toc aria-label="On this page" {
            (render_items(outline))
        }
    }
}

fn render_items(items: &[HeadingNode]) -> Markup {
    html! {
        ul {
            @for item in items {
                li {
                    a href={ "#" (item.id) } { (item.text) }
                    @if !item.children.is_empty() {
                        (render_items(&item.children))
                    }
                }
            }
        }
    }
}
