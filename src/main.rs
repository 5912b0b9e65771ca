use clap::{Parser, Subcommand};
use folio::diagnostics::Diagnostics;
use folio::generate::{self, BuildMode, GenerateError};
use folio::tree::TreeError;
use folio::config::{self, SiteConfig};
use folio::output;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that judge content.
#[derive(clap::Args, Clone)]
struct StrictArgs {
    /// Treat broken and ambiguous links as errors
    #[arg(long)]
    strict: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Static site generator for folders of cross-linked notes")]
#[command(long_about = "\
Static site generator for folders of cross-linked notes

Your filesystem is the data source. Folders become sections, markdown files
become pages, filename prefixes set the order, and [[wiki links]] between
notes become real hyperlinks.

Content structure:

  content/
  ├── config.toml                  # Site config (optional)
  ├── index.md                     # Home page
  ├── 0. Inbox.md                  # Ordered by numeric prefix
  ├── 01-Guide/                    # Folder, ordered by prefix
  │   ├── index.md                 # Folder landing page
  │   ├── 01-install.md            # Links with [[usage]] or [[../index]]
  │   ├── 02-usage.md
  │   └── My Diagram.png           # Embedded with ![[My Diagram.png]]
  ├── journal/
  │   ├── 2024-03-15-spring.md     # Date prefix, newest first
  │   └── 2023-12-01-winter.md
  └── 2023 Goals.md                # Four digits are a year, not an order

Reference syntax:
  [[target]]  [[target|label]]  [[target#heading]]  ![[image.png]]

Run 'folio gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Log build progress
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build(StrictArgs),
    /// Resolve everything and report problems without writing output
    Check(StrictArgs),
    /// Print the content tree as it will be built
    Scan {
        /// Print the tree as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build(args) => run_build(&cli.source, &cli.output, BuildMode::Write, args.strict),
        Command::Check(args) => run_build(&cli.source, &cli.output, BuildMode::Check, args.strict),
        Command::Scan { json } => {
            let site_config = config::load_config(&cli.source)?;
            let site = match generate::load_site(&cli.source, &cli.output, site_config) {
                Ok(site) => site,
                Err(GenerateError::Tree(TreeError::SlugCollision(collisions))) => {
                    report_collisions(&collisions);
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&site.tree)?);
            } else {
                output::print_tree(&site.tree);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_build(
    source: &Path,
    output_dir: &Path,
    mode: BuildMode,
    strict: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let site_config = config::load_config(source)?;
    init_thread_pool(&site_config);

    match mode {
        BuildMode::Write => println!("==> Building {} → {}", source.display(), output_dir.display()),
        BuildMode::Check => println!("==> Checking {}", source.display()),
    }

    let report = match generate::build(source, output_dir, site_config, mode, strict) {
        Ok(report) => report,
        Err(GenerateError::Tree(TreeError::SlugCollision(collisions))) => {
            report_collisions(&collisions);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    output::print_diagnostics(&report.diagnostics);
    output::print_summary(&report, mode, output_dir);
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report_collisions(collisions: &Diagnostics) {
    eprintln!("Sibling entries share a slug; nothing was written:");
    output::print_diagnostics(collisions);
}

/// Size the global rayon pool from `[processing]`, capped at the core count.
fn init_thread_pool(site_config: &SiteConfig) {
    let threads = config::effective_threads(&site_config.processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
