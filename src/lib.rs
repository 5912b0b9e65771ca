//! # Folio
//!
//! A static site generator for folders of loosely structured, cross-linked
//! notes. Your filesystem is the data source: folders become sections,
//! markdown files become pages, filename prefixes set the order, and
//! `[[wiki links]]` between notes become real hyperlinks.
//!
//! # Architecture: Resolve Once, Render in Parallel
//!
//! ```text
//! 1. Scan      content/   →  flat listing         (filesystem → entries)
//! 2. Render    *.md       →  HTML + titles         (markdown → HTML bodies)
//! 3. Tree      listing    →  ContentTree           (names → ordered, addressed tree)
//! 4. Pages     per page   →  dist/**/*.html        (links, outline, nav, shell)
//! ```
//!
//! Stages 1–3 run sequentially and end with an immutable [`tree::ContentTree`].
//! That tree is the only synchronization point: once it exists, every page
//! can resolve its links, build its outline and render its navigation
//! independently on the rayon pool.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Filename conventions: ordering prefixes, dates, titles, slugs |
//! | [`tree`] | Arena-backed content tree with stable output paths and sibling order |
//! | [`links`] | `[[wiki link]]` parsing, tiered resolution and HTML rewriting |
//! | [`outline`] | Per-page heading outline and table of contents |
//! | [`nav`] | Whole-site navigation with active and open markers |
//! | [`diagnostics`] | Broken links, collisions and page failures, merged per build |
//! | [`render`] | Markdown to HTML via pulldown-cmark, with heading ids |
//! | [`scan`] | Directory walk producing the flat listing |
//! | [`generate`] | Build driver and page shells (Maud) |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`output`] | CLI output formatting for trees, diagnostics and summaries |
//!
//! # Design Decisions
//!
//! ## Arena Over Pointers
//!
//! Nodes live in one `Vec` and refer to each other by [`tree::NodeId`]. Parent
//! links are indices assigned once, so the tree has no reference cycles and
//! can be shared across threads as a plain `&ContentTree`.
//!
//! ## Deterministic Resolution
//!
//! A reference that could mean several notes always resolves the same way:
//! earlier tiers beat later ones, closer notes beat distant ones, and any
//! remaining tie goes to the first note in scan order with a warning. The
//! same content always produces the same site.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time HTML
//! macro system. Interpolation is escaped by default and there is no template
//! directory to ship or get out of sync.

pub mod config;
pub mod diagnostics;
pub mod generate;
pub mod html;
pub mod links;
pub mod naming;
pub mod nav;
pub mod outline;
pub mod output;
pub mod render;
pub mod scan;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
