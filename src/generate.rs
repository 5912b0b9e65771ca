//! Site build driver.
//!
//! Runs the whole pipeline for one content directory and writes the static
//! site:
//!
//! ```text
//! 1. Config     content/config.toml  → SiteConfig
//! 2. Scan       content/             → flat listing
//! 3. Render     *.md                 → HTML bodies + declared titles
//! 4. Tree       listing + titles     → ContentTree          (barrier)
//! 5. Pages      per page, in parallel: links → outline → nav → shell
//! 6. Assets     attachments copied byte for byte
//! ```
//!
//! The caller runs step 1 once and hands the config in, since it also sizes
//! the thread pool. Steps 2–4 are sequential. A slug collision in step 4
//! aborts the build before anything is written. Step 5 runs on the rayon
//! pool; each page collects its own diagnostics and the driver merges them
//! at the end, so a failure on one page never stops the others.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                 # content/index.md
//! ├── intro.html                 # content/01-intro.md
//! └── guide/
//!     ├── index.html             # content/02-Guide/index.md
//!     ├── install.html
//!     └── My-Diagram.png         # copied attachment
//! ```
//!
//! ## HTML Generation
//!
//! Page shells use [maud](https://maud.lambda.xyz/). The stylesheet in
//! `static/style.css` is embedded at compile time and inlined into every
//! page, so the output directory has no support files to keep in sync.

use crate::config::{ConfigError, SiteConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::links::{Resolver, page_url};
use crate::nav::render_nav;
use crate::naming;
use crate::outline::{extract_outline, render_toc};
use crate::render::{RenderedPage, render_markdown};
use crate::scan::{ScanEntry, ScanError, scan_content};
use crate::tree::{ContentNode, ContentTree, TreeError, TreeOptions};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

const CSS: &str = include_str!("../static/style.css");

/// Whether a build writes output or only validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Write,
    Check,
}

/// What a finished build produced.
#[derive(Debug)]
pub struct BuildReport {
    pub pages_checked: usize,
    pub pages_written: usize,
    pub attachments_copied: usize,
    pub diagnostics: Diagnostics,
    pub strict: bool,
}

impl BuildReport {
    /// Page failures always fail the build; soft diagnostics only when strict.
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_hard() && !(self.strict && self.diagnostics.has_soft())
    }
}

/// Everything the page workers share.
struct PageContext<'a> {
    tree: &'a ContentTree,
    resolver: Resolver<'a>,
    config: &'a SiteConfig,
    output_dir: Option<&'a Path>,
}

/// Result of producing one page.
struct PageOutcome {
    diagnostics: Vec<Diagnostic>,
    written: bool,
}

/// Everything known about the content before any page is produced.
pub struct Site {
    pub config: SiteConfig,
    pub tree: ContentTree,
    rendered: HashMap<PathBuf, RenderedPage>,
    unreadable: HashMap<PathBuf, String>,
}

/// Scan, render every document and assemble the tree.
///
/// `config` is the already loaded `config.toml` of `source`. `output` is
/// left out of the scan when it lives inside `source`.
pub fn load_site(
    source: &Path,
    output: &Path,
    config: SiteConfig,
) -> Result<Site, GenerateError> {
    info!(source = %source.display(), "scanning content");
    let entries = scan_content(source, &[output.to_path_buf()])?;

    let (rendered, unreadable) = render_sources(source, &entries, &config);
    let declared_titles: HashMap<PathBuf, String> = rendered
        .iter()
        .filter_map(|(path, page)| page.title.clone().map(|t| (path.clone(), t)))
        .collect();

    let tree = ContentTree::build(
        &entries,
        &declared_titles,
        &TreeOptions::from_site_config(&config),
    )?;
    info!(
        pages = tree.page_count(),
        attachments = tree.attachment_count(),
        "content tree built"
    );

    Ok(Site {
        config,
        tree,
        rendered,
        unreadable,
    })
}

/// Build the site in `source` into `output`.
///
/// `strict` is OR-ed with `links.strict` from the config.
pub fn build(
    source: &Path,
    output: &Path,
    config: SiteConfig,
    mode: BuildMode,
    strict: bool,
) -> Result<BuildReport, GenerateError> {
    let Site {
        config,
        tree,
        rendered,
        unreadable,
    } = load_site(source, output, config)?;
    let strict = strict || config.links.strict;

    let output_dir = match mode {
        BuildMode::Write => {
            fs::create_dir_all(output)?;
            Some(output)
        }
        BuildMode::Check => None,
    };
    let ctx = PageContext {
        tree: &tree,
        resolver: Resolver::new(
            &tree,
            &config.content.document_extension,
            &config.site.base_url,
        ),
        config: &config,
        output_dir,
    };

    let jobs: Vec<(&ContentNode, Result<&RenderedPage, &String>)> = tree
        .pages()
        .filter_map(|node| {
            let source = rendered
                .get(&node.source_path)
                .map(Ok)
                .or_else(|| unreadable.get(&node.source_path).map(Err))?;
            Some((node, source))
        })
        .collect();

    let outcomes: Vec<PageOutcome> = jobs
        .par_iter()
        .map(|(node, source)| match source {
            Ok(page) => build_page(&ctx, node, page),
            Err(reason) => PageOutcome {
                diagnostics: vec![Diagnostic::new(
                    node.output_path.clone(),
                    DiagnosticKind::PageFailed,
                    format!("could not read {}: {reason}", node.source_path.display()),
                )],
                written: false,
            },
        })
        .collect();

    let pages_written = outcomes.iter().filter(|o| o.written).count();
    let (attachments_copied, copy_failures) = match output_dir {
        Some(dir) => copy_attachments(source, dir, &tree),
        None => (0, Vec::new()),
    };

    let diagnostics = Diagnostics::merge(
        outcomes
            .into_iter()
            .map(|o| o.diagnostics)
            .chain([tree.warnings().to_vec(), copy_failures]),
    );
    for diagnostic in diagnostics.entries() {
        debug!("{diagnostic}");
    }
    let soft = diagnostics.entries().iter().filter(|d| d.kind.is_soft()).count();
    if soft > 0 {
        warn!(count = soft, "content has unresolved or ambiguous references");
    }

    info!(
        pages = pages_written,
        attachments = attachments_copied,
        diagnostics = diagnostics.len(),
        "build finished"
    );
    Ok(BuildReport {
        pages_checked: tree.page_count(),
        pages_written,
        attachments_copied,
        diagnostics,
        strict,
    })
}

/// Read and render every document. Unreadable files are kept aside with
/// the reason so they can be reported against their page once paths exist.
fn render_sources(
    source: &Path,
    entries: &[ScanEntry],
    config: &SiteConfig,
) -> (HashMap<PathBuf, RenderedPage>, HashMap<PathBuf, String>) {
    let mut rendered = HashMap::new();
    let mut unreadable = HashMap::new();
    for entry in entries.iter().filter(|e| is_document(e, config)) {
        match fs::read_to_string(source.join(&entry.relative_path)) {
            Ok(markdown) => {
                debug!(path = %entry.relative_path.display(), "rendering markdown");
                rendered.insert(entry.relative_path.clone(), render_markdown(&markdown));
            }
            Err(e) => {
                unreadable.insert(entry.relative_path.clone(), e.to_string());
            }
        }
    }
    (rendered, unreadable)
}

fn is_document(entry: &ScanEntry, config: &SiteConfig) -> bool {
    if entry.is_dir {
        return false;
    }
    let name = entry
        .relative_path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    naming::split_extension(&name)
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&config.content.document_extension))
}

fn build_page(ctx: &PageContext, node: &ContentNode, page: &RenderedPage) -> PageOutcome {
    let mut sink = Vec::new();
    let body = ctx.resolver.rewrite_html(&page.html, node.id, &mut sink);
    let outline = extract_outline(&body, ctx.config.outline.min_headings);
    let nav = render_nav(ctx.tree, &node.output_path, &ctx.config.site.base_url);
    let document = render_page(ctx, node, page.title.is_some(), &body, render_toc(&outline), nav);

    let Some(output_dir) = ctx.output_dir else {
        return PageOutcome {
            diagnostics: sink,
            written: false,
        };
    };
    let target = output_dir.join(format!("{}.html", node.output_path));
    let written = match write_file(&target, document.into_string().as_bytes()) {
        Ok(()) => {
            debug!(page = %node.output_path, "wrote page");
            true
        }
        Err(e) => {
            sink.push(Diagnostic::new(
                node.output_path.clone(),
                DiagnosticKind::PageFailed,
                format!("could not write {}: {e}", target.display()),
            ));
            false
        }
    };
    PageOutcome {
        diagnostics: sink,
        written,
    }
}

fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Copy every attachment to its output path. Failures become diagnostics.
fn copy_attachments(source: &Path, output: &Path, tree: &ContentTree) -> (usize, Vec<Diagnostic>) {
    let results: Vec<Result<(), Diagnostic>> = tree
        .attachments()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|node| {
            let from = source.join(&node.source_path);
            let to = output.join(&node.output_path);
            let copied = to
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::copy(&from, &to).map(|_| ()));
            copied.map_err(|e| {
                Diagnostic::new(
                    node.output_path.clone(),
                    DiagnosticKind::PageFailed,
                    format!("could not copy {}: {e}", from.display()),
                )
            })
        })
        .collect();

    let copied = results.iter().filter(|r| r.is_ok()).count();
    let failures = results.into_iter().filter_map(Result::err).collect();
    (copied, failures)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Renders the site header linking back home
fn site_header(site_title: &str, home: &str) -> Markup {
    html! {
        header.site-header {
            a.site-title href=(home) { (site_title) }
        }
    }
}

fn render_page(
    ctx: &PageContext,
    node: &ContentNode,
    has_declared_title: bool,
    body: &str,
    toc: Markup,
    nav: Markup,
) -> Markup {
    let site_title = &ctx.config.site.title;
    let base_url = &ctx.config.site.base_url;
    let root = ctx.tree.root();
    let home = match root.index {
        Some(index) => page_url(base_url, &ctx.tree.node(index).output_path),
        None => base_url.to_string(),
    };
    let is_home = root.index == Some(node.id);
    let title = if is_home {
        site_title.to_string()
    } else {
        format!("{} · {}", node.title, site_title)
    };

    let content = html! {
        (site_header(site_title, &home))
        div.layout {
            aside.sidebar { (nav) }
            main {
                article {
                    @if !has_declared_title {
                        h1.page-title { (node.title) }
                    }
                    (PreEscaped(body))
                }
            }
            aside.outline { (toc) }
        }
    };
    base_document(&title, CSS, content)
}
