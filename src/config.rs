//! `config.toml` at the content root.
//!
//! The file is optional and sparse: whatever it sets is laid over the
//! built-in defaults section by section, then the result is checked.
//!
//! ## Keys and defaults
//!
//! ```toml
//! [site]
//! title = "Home"            # Root title, shown in the header and nav
//! base_url = "/"            # Prefix for every generated link
//!
//! [content]
//! document_extension = "md" # Files with this extension become pages
//! index_name = "index"      # Slug that marks a folder's landing page
//! date_order = "descending" # Order of YYYY-MM-DD- prefixed siblings
//!
//! [outline]
//! min_headings = 3          # Fewer headings than this: no table of contents
//!
//! [links]
//! strict = false            # Fail the build on broken or ambiguous links
//!
//! [processing]
//! max_processes = 4         # Max parallel page workers (omit for auto = CPU cores)
//! ```
//!
//! A misspelled key is an error rather than a silently ignored setting.

use crate::naming::{self, DateOrder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config.toml: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Validation(String),
}

/// Everything a build can be told through `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity and link prefix.
    pub site: SiteSection,
    /// How the content directory is interpreted.
    pub content: ContentConfig,
    /// Per-page table of contents.
    pub outline: OutlineConfig,
    /// Wiki-link reporting.
    pub links: LinksConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.content.document_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(ConfigError::Validation(
                "content.document_extension must be a bare extension like \"md\"".into(),
            ));
        }
        let index = &self.content.index_name;
        if index.is_empty() || naming::slugify(index) != *index {
            return Err(ConfigError::Validation(format!(
                "content.index_name must be a lower-case slug, got \"{index}\""
            )));
        }
        if self.outline.min_headings == 0 {
            return Err(ConfigError::Validation(
                "outline.min_headings must be at least 1".into(),
            ));
        }
        if !self.site.base_url.starts_with('/') && !self.site.base_url.contains("://") {
            return Err(ConfigError::Validation(
                "site.base_url must start with \"/\" or be an absolute URL".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Title of the root node.
    pub title: String,
    /// Prefix prepended to every generated link.
    pub base_url: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "Home".to_string(),
            base_url: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Extension (without dot) of files rendered as pages.
    pub document_extension: String,
    /// Slug of the page that acts as a folder's landing page.
    pub index_name: String,
    /// Sort direction for date-prefixed siblings.
    pub date_order: DateOrder,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            document_extension: "md".to_string(),
            index_name: "index".to_string(),
            date_order: DateOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlineConfig {
    /// Minimum number of h2–h4 headings before a table of contents is shown.
    pub min_headings: usize,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self { min_headings: 3 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// Exit non-zero when any broken or ambiguous link was recorded.
    pub strict: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Upper bound on page workers; unset means one per core.
    pub max_processes: Option<usize>,
}

/// Worker count for the page pool: the configured cap, clamped to `1..=cores`.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    config.max_processes.map_or(cores, |n| n.clamp(1, cores))
}

// =============================================================================
// Loading
// =============================================================================

const CONFIG_FILE: &str = "config.toml";

/// Overlay `user` onto `stock`, descending into tables so a file that sets
/// one key in a section keeps the stock value of every other key.
pub fn merge_toml(stock: toml::Value, user: toml::Value) -> toml::Value {
    match (stock, user) {
        (toml::Value::Table(mut stock), toml::Value::Table(user)) => {
            for (key, value) in user {
                let value = match stock.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                stock.insert(key, value);
            }
            toml::Value::Table(stock)
        }
        (_, user) => user,
    }
}

/// Read `config.toml` from the content root and apply it over the defaults.
///
/// A missing file yields the defaults. A file that fails to parse, names an
/// unknown key or holds an out-of-range value is an error.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if !path.is_file() {
        return Ok(SiteConfig::default());
    }
    let user: toml::Value = toml::from_str(&fs::read_to_string(&path)?)?;
    let stock = toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("defaults do not serialize: {e}")))?;
    let config: SiteConfig = merge_toml(stock, user).try_into()?;
    config.validate()?;
    Ok(config)
}

/// The documented default `config.toml` printed by `folio gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# folio configuration
# ===================
# Every key is optional and shows its default. Delete what you don't change.
# The file lives in the content root; misspelled keys are reported as errors.

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
# Title of the home node, used in the header and navigation.
title = "Home"

# Prefix for every generated link. Use "/docs/" when the site is served
# from a sub-path, or a full URL for absolute links.
base_url = "/"

# ---------------------------------------------------------------------------
# Content conventions
# ---------------------------------------------------------------------------
[content]
# Files with this extension become pages; everything else is an attachment
# copied verbatim.
document_extension = "md"

# A page with this slug becomes its folder's landing page.
index_name = "index"

# Sort direction for date-prefixed siblings (2024-03-15-post.md):
# "descending" (newest first) or "ascending".
date_order = "descending"

# ---------------------------------------------------------------------------
# Table of contents
# ---------------------------------------------------------------------------
[outline]
# Pages with fewer h2-h4 headings than this get no table of contents.
min_headings = 3

# ---------------------------------------------------------------------------
# Wiki-links
# ---------------------------------------------------------------------------
[links]
# When true, broken or ambiguous [[links]] make the build exit non-zero.
strict = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Cap on parallel page workers. Leave unset to use one per CPU core.
#max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.site.title, "Home");
        assert_eq!(config.site.base_url, "/");
        assert_eq!(config.content.document_extension, "md");
        assert_eq!(config.content.index_name, "index");
        assert_eq!(config.content.date_order, DateOrder::Descending);
        assert_eq!(config.outline.min_headings, 3);
        assert!(!config.links.strict);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn sparse_section_keeps_other_defaults() {
        let toml = r#"
[links]
strict = true
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert!(config.links.strict);
        assert_eq!(config.outline.min_headings, 3);
        assert_eq!(config.content.index_name, "index");
    }

    #[test]
    fn parse_date_order() {
        let config: SiteConfig = toml::from_str("[content]\ndate_order = \"ascending\"\n").unwrap();
        assert_eq!(config.content.date_order, DateOrder::Ascending);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[links]\nstrictt = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn merge_keeps_base_keys() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn missing_file_means_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.title, "Home");
    }

    #[test]
    fn file_overrides_only_what_it_sets() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[site]
title = "Field Notes"

[outline]
min_headings = 2
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.title, "Field Notes");
        assert_eq!(config.outline.min_headings, 2);
        assert_eq!(config.site.base_url, "/");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn extension_with_dot_is_invalid() {
        let mut config = SiteConfig::default();
        config.content.document_extension = ".md".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn index_name_must_be_a_slug() {
        let mut config = SiteConfig::default();
        config.content.index_name = "Read Me".to_string();
        assert!(config.validate().is_err());
        config.content.index_name = "readme".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_min_headings_is_invalid() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[outline]\nmin_headings = 0\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn relative_base_url_is_invalid() {
        let mut config = SiteConfig::default();
        config.site.base_url = "docs/".to_string();
        assert!(config.validate().is_err());
        config.site.base_url = "https://example.com/notes/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.site.title, defaults.site.title);
        assert_eq!(config.content.date_order, defaults.content.date_order);
        assert_eq!(config.outline.min_headings, defaults.outline.min_headings);
        config.validate().unwrap();
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
