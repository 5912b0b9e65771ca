//! Whole-site navigation.
//!
//! Renders the content tree as nested lists for the sidebar of every page:
//!
//! ```text
//! Home                     root index    → link, always first
//! Intro                    page          → link
//! Guide                    folder+index  → link to guide/index
//!   Install                              (index page not repeated)
//!   Usage
//! Notes                    folder        → plain label
//!   Kickoff
//! ```
//!
//! Attachments never appear. The entry for the page being rendered gets the
//! `active` class and every folder above it gets `open`, so the stylesheet
//! can expand just the branch the reader is in.

use crate::links::page_url;
use crate::naming::NodeKind;
use crate::tree::{ContentNode, ContentTree, NodeId};
use maud::{Markup, html};

/// Render navigation for the page at `current_path`.
pub fn render_nav(tree: &ContentTree, current_path: &str, base_url: &str) -> Markup {
    if tree.is_empty() {
        return html! {};
    }
    let ctx = NavContext {
        tree,
        current_path,
        base_url,
    };
    let home = tree.root().index.map(|id| tree.node(id));
    html! {
        nav.site-nav aria-label="Site" {
            @if let Some(home) = home {
                ul.home {
                    li class=[(home.output_path == current_path).then_some("active")] {
                        a href=(page_url(base_url, &home.output_path)) { (tree.root().title) }
                    }
                }
            }
            (ctx.render_children(tree.root()))
        }
    }
}

struct NavContext<'a> {
    tree: &'a ContentTree,
    current_path: &'a str,
    base_url: &'a str,
}

impl NavContext<'_> {
    fn render_children(&self, folder: &ContentNode) -> Markup {
        let visible: Vec<&ContentNode> = self
            .tree
            .children(folder.id)
            .filter(|child| self.is_listed(folder, child))
            .collect();
        html! {
            @if !visible.is_empty() {
                ul {
                    @for child in visible {
                        (self.render_item(child))
                    }
                }
            }
        }
    }

    fn is_listed(&self, folder: &ContentNode, child: &ContentNode) -> bool {
        match child.kind {
            NodeKind::Attachment => false,
            NodeKind::Page => folder.index != Some(child.id),
            NodeKind::Folder => true,
        }
    }

    fn render_item(&self, node: &ContentNode) -> Markup {
        match node.kind {
            NodeKind::Page => {
                let is_active = node.output_path == self.current_path;
                html! {
                    li class=[is_active.then_some("active")] {
                        a href=(page_url(self.base_url, &node.output_path)) { (node.title) }
                    }
                }
            }
            NodeKind::Folder => {
                let index = node.index.map(|id| self.tree.node(id));
                let is_active = index.is_some_and(|i| i.output_path == self.current_path);
                let is_open = self.contains_current(node.id);
                html! {
                    li.folder.open[is_open].active[is_active] {
                        @if let Some(index) = index {
                            a href=(page_url(self.base_url, &index.output_path)) { (node.title) }
                        } @else {
                            span.nav-label { (node.title) }
                        }
                        (self.render_children(node))
                    }
                }
            }
            NodeKind::Attachment => html! {},
        }
    }

    fn contains_current(&self, folder: NodeId) -> bool {
        let path = &self.tree.node(folder).output_path;
        self.current_path
            .strip_prefix(path.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}
