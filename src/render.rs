//! Markdown to HTML.
//!
//! Thin layer over pulldown-cmark. Two things are added on top of the stock
//! renderer:
//!
//! - every heading gets a unique `id` (explicit `{#id}` attributes win,
//!   otherwise the slug of its text, `-1`, `-2`... on repeats), so the
//!   outline and `[[page#anchor]]` references have something to point at;
//! - the text of the first `# h1` is returned as the page's declared title.
//!
//! Wiki-link tokens are plain text to pulldown-cmark and come through
//! untouched; [`crate::links`] rewrites them once the tree exists.

use crate::naming::slugify;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};
use std::collections::HashSet;

/// A page's HTML body before link rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    /// Text of the first level-one heading.
    pub title: Option<String>,
}

pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

pub fn render_markdown(source: &str) -> RenderedPage {
    let mut events: Vec<Event> = Parser::new_ext(source, markdown_options()).collect();
    let mut ids = HeadingIds::default();
    let mut title = None;

    let mut i = 0;
    while i < events.len() {
        let Event::Start(Tag::Heading { level, id, .. }) = &events[i] else {
            i += 1;
            continue;
        };
        let level = *level;
        let explicit = id.as_ref().map(|s| s.to_string());
        let end = events[i..]
            .iter()
            .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
            .map_or(events.len(), |offset| i + offset);
        let text = plain_text(&events[i + 1..end]);

        if level == HeadingLevel::H1 && title.is_none() && !text.is_empty() {
            title = Some(text.clone());
        }
        let unique = ids.claim(explicit.unwrap_or_else(|| slugify(&text)));
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(unique));
        }
        i = end + 1;
    }

    let mut html = String::with_capacity(source.len() * 3 / 2);
    md_html::push_html(&mut html, events.into_iter());
    RenderedPage { html, title }
}

fn plain_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) | Event::InlineMath(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ids already handed out on one page.
#[derive(Default)]
struct HeadingIds {
    used: HashSet<String>,
}

impl HeadingIds {
    fn claim(&mut self, wanted: String) -> String {
        let base = if wanted.is_empty() {
            "section".to_string()
        } else {
            wanted
        };
        let mut candidate = base.clone();
        let mut n = 0;
        while self.used.contains(&candidate) {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_get_slug_ids() {
        let page = render_markdown("## Getting Started\n\ntext\n");
        assert!(page.html.contains("<h2 id=\"getting-started\">Getting Started</h2>"));
    }

    #[test]
    fn repeated_headings_get_numbered_ids() {
        let page = render_markdown("## Notes\n\n## Notes\n\n### Notes\n");
        assert!(page.html.contains("id=\"notes\""));
        assert!(page.html.contains("id=\"notes-1\""));
        assert!(page.html.contains("id=\"notes-2\""));
    }

    #[test]
    fn explicit_id_attribute_wins() {
        let page = render_markdown("## Setup {#install}\n");
        assert!(page.html.contains("<h2 id=\"install\">Setup</h2>"));
    }

    #[test]
    fn heading_text_includes_inline_code() {
        let page = render_markdown("## Run `cargo test` now\n");
        assert!(page.html.contains("id=\"run-cargo-test-now\""));
    }

    #[test]
    fn symbol_only_heading_falls_back() {
        let page = render_markdown("## ???\n");
        assert!(page.html.contains("id=\"section\""));
    }

    #[test]
    fn first_h1_is_declared_title() {
        let page = render_markdown("Intro line\n\n# Real *Title*\n\n# Second\n");
        assert_eq!(page.title.as_deref(), Some("Real Title"));
        assert!(page.html.contains("<h1 id=\"real-title\">"));
    }

    #[test]
    fn no_h1_means_no_title() {
        assert_eq!(render_markdown("## Only h2\n").title, None);
        assert_eq!(render_markdown("").title, None);
    }

    #[test]
    fn wiki_tokens_pass_through() {
        let page = render_markdown("See [[Other Page|label]] and ![[My Image.png]].\n");
        assert!(page.html.contains("[[Other Page|label]]"));
        assert!(page.html.contains("![[My Image.png]]"));
    }

    #[test]
    fn extensions_enabled() {
        let page = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~\n\n- [x] done\n");
        assert!(page.html.contains("<table>"));
        assert!(page.html.contains("<del>old</del>"));
        assert!(page.html.contains("type=\"checkbox\""));
    }
}
