//! Centralized filename parsing for ordering prefixes, dates and slugs.
//!
//! Every entry in the content directory (pages, folders, attachments) goes
//! through [`normalize`], which turns the raw filename into an order key, a
//! display title and a URL slug. Authors rely on these conventions, so they
//! are exact:
//!
//! | Filename | Order key | Title |
//! |----------|-----------|-------|
//! | `01-name.md` | `Number(1)` | "name" |
//! | `02 name.md` | `Number(2)` | "name" |
//! | `6 - Name.md` | `Number(6)` | "Name" |
//! | `0. Inbox.md` | `Number(0)` | "Inbox" |
//! | `2023 Goals.md` | `Lexical("2023 Goals.md")` | "2023 Goals" |
//! | `2024-03-15-post.md` | `Date(2024-03-15)` | "post" |
//!
//! A leading run of exactly four digits is a year, never an ordering prefix.
//!
//! ## Display Titles
//!
//! Dashes and underscores in the remaining text become spaces:
//! - `010-getting-started.md` → "getting started"
//! - `snake_case_note.md` → "snake case note"
//!
//! ## Attachments
//!
//! Files that are not documents keep their filename as slug, with only spaces
//! turned into dashes. The extension is never touched, so `![[My Image.png]]`
//! points at `My-Image.png` in the output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The closed set of things a content entry can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A document rendered to HTML.
    Page,
    /// A directory.
    Folder,
    /// Any other file, copied verbatim.
    Attachment,
}

/// Sort key derived from a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum OrderKey {
    /// Explicit ordering prefix (`01-`, `6 - `, `0. `).
    Number(u64),
    /// Full `YYYY-MM-DD-` date prefix.
    Date(NaiveDate),
    /// No prefix: the filename itself.
    Lexical(String),
}

/// Direction in which date-prefixed siblings are sorted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    Ascending,
    /// Newest first, the usual order for journals and blog folders.
    #[default]
    Descending,
}

impl OrderKey {
    fn rank(&self) -> u8 {
        match self {
            OrderKey::Number(_) => 0,
            OrderKey::Date(_) => 1,
            OrderKey::Lexical(_) => 2,
        }
    }

    /// Total order over keys. Numbered entries come first, then dated ones,
    /// then everything else.
    pub fn compare(&self, other: &OrderKey, date_order: DateOrder) -> Ordering {
        match (self, other) {
            (OrderKey::Number(a), OrderKey::Number(b)) => a.cmp(b),
            (OrderKey::Date(a), OrderKey::Date(b)) => match date_order {
                DateOrder::Ascending => a.cmp(b),
                DateOrder::Descending => b.cmp(a),
            },
            (OrderKey::Lexical(a), OrderKey::Lexical(b)) => cmp_ignore_case(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Result of normalizing a raw filename.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedName {
    pub kind: NodeKind,
    pub order_key: OrderKey,
    /// Display title before any declared heading override.
    pub title: String,
    /// URL segment. `None` when nothing is left after stripping prefixes;
    /// the tree builder substitutes a positional placeholder.
    pub slug: Option<String>,
}

/// Normalize one directory entry name.
///
/// `document_ext` is compared case-insensitively and without the dot
/// (`"md"`). Never fails: every name produces some result.
pub fn normalize(raw_name: &str, is_dir: bool, document_ext: &str) -> NormalizedName {
    if is_dir {
        return normalize_text(raw_name, raw_name, NodeKind::Folder);
    }
    match split_extension(raw_name) {
        Some((stem, ext)) if ext.eq_ignore_ascii_case(document_ext) => {
            normalize_text(stem, raw_name, NodeKind::Page)
        }
        _ => normalize_attachment(raw_name),
    }
}

/// Split `name.ext` into `("name", "ext")`. Dotfiles and names ending in a
/// dot have no extension.
pub fn split_extension(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    if dot == 0 || dot + 1 == name.len() {
        return None;
    }
    Some((&name[..dot], &name[dot + 1..]))
}

fn normalize_text(text: &str, raw_name: &str, kind: NodeKind) -> NormalizedName {
    let (order_key, rest) = if let Some((number, rest)) = strip_ordering_prefix(text) {
        (OrderKey::Number(number), rest)
    } else if let Some((date, rest)) = strip_date_prefix(text) {
        (OrderKey::Date(date), rest)
    } else {
        (OrderKey::Lexical(raw_name.to_string()), text)
    };

    let title = display_title(rest);
    let slug = slugify(&title);
    let title = if title.is_empty() {
        display_title(text)
    } else {
        title
    };

    NormalizedName {
        kind,
        order_key,
        title: if title.is_empty() {
            raw_name.to_string()
        } else {
            title
        },
        slug: (!slug.is_empty()).then_some(slug),
    }
}

fn normalize_attachment(raw_name: &str) -> NormalizedName {
    let stem = split_extension(raw_name).map_or(raw_name, |(stem, _)| stem);
    let order_key = if let Some((number, _)) = strip_ordering_prefix(stem) {
        OrderKey::Number(number)
    } else if let Some((date, _)) = strip_date_prefix(stem) {
        OrderKey::Date(date)
    } else {
        OrderKey::Lexical(raw_name.to_string())
    };
    let slug = attachment_slug(raw_name);

    NormalizedName {
        kind: NodeKind::Attachment,
        order_key,
        title: raw_name.to_string(),
        slug: (!slug.is_empty()).then_some(slug),
    }
}

/// Slug for a non-document file: spaces become dashes, nothing else changes.
pub fn attachment_slug(name: &str) -> String {
    name.trim().replace(' ', "-")
}

/// Parse a leading ordering prefix: a digit run followed by `" - "`, `.`,
/// `-` or a single space. Four-digit runs are years and never match.
fn strip_ordering_prefix(text: &str) -> Option<(u64, &str)> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits == 4 {
        return None;
    }
    let number = text[..digits].parse::<u64>().ok()?;
    let rest = &text[digits..];
    let rest = match rest.strip_prefix(" - ") {
        Some(r) => r,
        None => rest.strip_prefix(|c: char| matches!(c, '.' | '-' | ' '))?,
    };
    Some((number, rest.trim_start()))
}

/// Parse a leading `YYYY-MM-DD-` date. The date must exist on the calendar.
fn strip_date_prefix(text: &str) -> Option<(NaiveDate, &str)> {
    let head = text.get(..11)?.as_bytes();
    let shape_ok = head.iter().enumerate().all(|(i, b)| match i {
        4 | 7 | 10 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    let year = text[0..4].parse().ok()?;
    let month = text[5..7].parse().ok()?;
    let day = text[8..10].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some((date, &text[11..]))
}

/// Display title: dashes and underscores become spaces, whitespace collapsed.
fn display_title(text: &str) -> String {
    text.replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn display text into a URL segment.
///
/// Lower-cases, turns whitespace into dashes, keeps alphanumerics, `-` and
/// `.`, and drops everything else. Also used for heading anchors.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        } else if c == '.' {
            slug.push('.');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Case-insensitive comparison used for lexical keys and title tie-breaks.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(name: &str) -> NormalizedName {
        normalize(name, false, "md")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // =========================================================================
    // Ordering prefixes
    // =========================================================================

    #[test]
    fn dash_separator() {
        let n = page("01-name.md");
        assert_eq!(n.order_key, OrderKey::Number(1));
        assert_eq!(n.title, "name");
        assert_eq!(n.slug.as_deref(), Some("name"));
        assert_eq!(n.kind, NodeKind::Page);
    }

    #[test]
    fn space_separator() {
        let n = page("02 name.md");
        assert_eq!(n.order_key, OrderKey::Number(2));
        assert_eq!(n.title, "name");
    }

    #[test]
    fn space_dash_space_separator() {
        let n = page("6 - Name.md");
        assert_eq!(n.order_key, OrderKey::Number(6));
        assert_eq!(n.title, "Name");
        assert_eq!(n.slug.as_deref(), Some("name"));
    }

    #[test]
    fn dot_separator() {
        let n = page("0. Inbox.md");
        assert_eq!(n.order_key, OrderKey::Number(0));
        assert_eq!(n.title, "Inbox");
        assert_eq!(n.slug.as_deref(), Some("inbox"));
    }

    #[test]
    fn long_prefix_is_still_a_number() {
        let n = page("12345-archive.md");
        assert_eq!(n.order_key, OrderKey::Number(12345));
        assert_eq!(n.title, "archive");
    }

    #[test]
    fn digits_without_separator_are_lexical() {
        let n = page("001.md");
        assert_eq!(n.order_key, OrderKey::Lexical("001.md".to_string()));
        assert_eq!(n.title, "001");
        assert_eq!(n.slug.as_deref(), Some("001"));

        let n = page("3d-printing.md");
        assert_eq!(n.order_key, OrderKey::Lexical("3d-printing.md".to_string()));
        assert_eq!(n.title, "3d printing");
    }

    // =========================================================================
    // Years and dates
    // =========================================================================

    #[test]
    fn four_digit_run_is_a_year() {
        let n = page("2023 Goals.md");
        assert_eq!(n.order_key, OrderKey::Lexical("2023 Goals.md".to_string()));
        assert_eq!(n.title, "2023 Goals");
        assert_eq!(n.slug.as_deref(), Some("2023-goals"));
    }

    #[test]
    fn year_with_dash_is_not_a_prefix() {
        let n = page("2023-review.md");
        assert!(matches!(n.order_key, OrderKey::Lexical(_)));
        assert_eq!(n.title, "2023 review");
    }

    #[test]
    fn date_prefix_is_stripped() {
        let n = page("2024-03-15-post.md");
        assert_eq!(n.order_key, OrderKey::Date(date(2024, 3, 15)));
        assert_eq!(n.title, "post");
        assert_eq!(n.slug.as_deref(), Some("post"));
    }

    #[test]
    fn impossible_date_falls_back_to_lexical() {
        let n = page("2024-13-45-post.md");
        assert!(matches!(n.order_key, OrderKey::Lexical(_)));
        assert_eq!(n.title, "2024 13 45 post");
    }

    #[test]
    fn dated_folder() {
        let n = normalize("2023-11-02-Lisbon-Trip", true, "md");
        assert_eq!(n.kind, NodeKind::Folder);
        assert_eq!(n.order_key, OrderKey::Date(date(2023, 11, 2)));
        assert_eq!(n.title, "Lisbon Trip");
        assert_eq!(n.slug.as_deref(), Some("lisbon-trip"));
    }

    // =========================================================================
    // Titles and slugs
    // =========================================================================

    #[test]
    fn underscores_and_dashes_become_spaces() {
        let n = page("snake_case-and-kebab.md");
        assert_eq!(n.title, "snake case and kebab");
        assert_eq!(n.slug.as_deref(), Some("snake-case-and-kebab"));
    }

    #[test]
    fn slug_drops_punctuation() {
        assert_eq!(slugify("C++ & Rust: Notes?"), "c-rust-notes");
        assert_eq!(slugify("Version 1.2"), "version-1.2");
        assert_eq!(slugify("  padded  "), "padded");
    }

    #[test]
    fn document_extension_is_case_insensitive() {
        let n = page("03-Readme.MD");
        assert_eq!(n.kind, NodeKind::Page);
        assert_eq!(n.title, "Readme");
    }

    #[test]
    fn empty_after_stripping_has_no_slug() {
        let n = page("01-.md");
        assert_eq!(n.order_key, OrderKey::Number(1));
        assert_eq!(n.slug, None);
        assert!(!n.title.is_empty());
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    #[test]
    fn attachment_keeps_extension_verbatim() {
        let n = page("diagram.PNG");
        assert_eq!(n.kind, NodeKind::Attachment);
        assert_eq!(n.slug.as_deref(), Some("diagram.PNG"));
        assert_eq!(n.title, "diagram.PNG");
    }

    #[test]
    fn attachment_spaces_become_dashes() {
        let n = page("My Image.png");
        assert_eq!(n.slug.as_deref(), Some("My-Image.png"));
    }

    #[test]
    fn attachment_prefix_orders_but_is_kept() {
        let n = page("01-cover.jpg");
        assert_eq!(n.order_key, OrderKey::Number(1));
        assert_eq!(n.slug.as_deref(), Some("01-cover.jpg"));
    }

    #[test]
    fn file_without_extension_is_attachment() {
        let n = page("LICENSE");
        assert_eq!(n.kind, NodeKind::Attachment);
        assert_eq!(n.slug.as_deref(), Some("LICENSE"));
    }

    // =========================================================================
    // Order key comparison
    // =========================================================================

    #[test]
    fn numbers_before_dates_before_lexical() {
        let num = OrderKey::Number(99);
        let day = OrderKey::Date(date(2020, 1, 1));
        let lex = OrderKey::Lexical("a.md".to_string());
        assert_eq!(num.compare(&day, DateOrder::Descending), Ordering::Less);
        assert_eq!(day.compare(&lex, DateOrder::Descending), Ordering::Less);
        assert_eq!(lex.compare(&num, DateOrder::Ascending), Ordering::Greater);
    }

    #[test]
    fn dates_follow_configured_direction() {
        let old = OrderKey::Date(date(2023, 1, 1));
        let new = OrderKey::Date(date(2024, 1, 1));
        assert_eq!(old.compare(&new, DateOrder::Ascending), Ordering::Less);
        assert_eq!(old.compare(&new, DateOrder::Descending), Ordering::Greater);
    }

    #[test]
    fn lexical_keys_ignore_case() {
        let a = OrderKey::Lexical("apple.md".to_string());
        let b = OrderKey::Lexical("Banana.md".to_string());
        assert_eq!(a.compare(&b, DateOrder::Descending), Ordering::Less);
    }

    #[test]
    fn numeric_order_is_not_lexical() {
        let two = OrderKey::Number(2);
        let ten = OrderKey::Number(10);
        assert_eq!(two.compare(&ten, DateOrder::Descending), Ordering::Less);
    }
}
