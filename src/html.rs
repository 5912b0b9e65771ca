//! Small helpers for reading rendered HTML fragments.
//!
//! The core never parses full documents. It only needs to pull plain text
//! out of headings, decode the handful of entities the markdown renderer
//! emits, and know which byte ranges sit inside code or inside a tag so
//! reference tokens there are left alone.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(pre|code)\b[^>]*>.*?</(?:pre|code)\s*>").unwrap());

/// Remove every tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Decode named and numeric character references.
///
/// Unknown references are kept as written.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|&end| end <= 10) {
            Some(end) => match decode_entity(&tail[1..end]) {
                Some(c) => {
                    out.push(c);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Byte ranges of `<pre>` and `<code>` elements.
pub fn code_ranges(html: &str) -> Vec<Range<usize>> {
    CODE_RE.find_iter(html).map(|m| m.range()).collect()
}

/// Byte ranges of the tags themselves, attributes included.
pub fn tag_ranges(html: &str) -> Vec<Range<usize>> {
    TAG_RE.find_iter(html).map(|m| m.range()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nested_markup() {
        assert_eq!(strip_tags("<em>Hello</em> <code>world</code>"), "Hello world");
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &quot;d&quot;"), "a & b <c> \"d\"");
        assert_eq!(decode_entities("it&#39;s &#x41;"), "it's A");
    }

    #[test]
    fn keeps_unknown_or_bare_ampersands() {
        assert_eq!(decode_entities("R&D &bogus; end &"), "R&D &bogus; end &");
    }

    #[test]
    fn finds_code_ranges() {
        let html = "<p>x</p><pre><code>[[a]]</code></pre><p><code>[[b]]</code></p>";
        let ranges = code_ranges(html);
        assert_eq!(ranges.len(), 2);
        assert!(html[ranges[0].clone()].contains("[[a]]"));
        assert!(html[ranges[1].clone()].contains("[[b]]"));
    }

    #[test]
    fn tag_ranges_cover_attributes() {
        let html = r#"<p><img src="a.png" alt="see [[x]]"> [[y]]</p>"#;
        let ranges = tag_ranges(html);
        let alt = html.find("[[x]]").unwrap();
        let text = html.find("[[y]]").unwrap();
        assert!(ranges.iter().any(|r| r.contains(&alt)));
        assert!(!ranges.iter().any(|r| r.contains(&text)));
    }
}
