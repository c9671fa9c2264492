//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use listing_mirror::config::{CrawlConfigBuilder, DownloadMode, split_list};
use listing_mirror::download::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF};
use listing_mirror::listing::ListingLayout;

/// Mirror a web directory listing to a local folder.
///
/// Folders are walked depth-first; each folder's files are downloaded
/// concurrently before moving on. Files that already exist with content are
/// skipped, so an interrupted run can simply be started again.
#[derive(Parser, Debug)]
#[command(name = "listing-mirror")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Local folder to mirror into
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Listing URL to start from
    #[arg(short, long)]
    pub url: Option<String>,

    /// Folder names to skip, matched exactly as listed including the trailing slash, e.g. Maps/ (comma-separated, repeatable)
    #[arg(short = 'x', long, value_name = "NAMES", conflicts_with = "only")]
    pub exclude: Vec<String>,

    /// Only mirror these folders (comma-separated, repeatable)
    #[arg(long, value_name = "NAMES")]
    pub only: Vec<String>,

    /// Skip files whose name contains any of these (comma-separated, repeatable)
    #[arg(short = 't', long, value_name = "PATTERNS")]
    pub ignore_types: Vec<String>,

    /// Maximum concurrent downloads per folder (1-100) [default: 5]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Listing markup: `list` or `litem-table` [default: list]
    #[arg(long)]
    pub layout: Option<ListingLayout>,

    /// Retries per file after the first attempt (0-50)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(0..=50))]
    pub max_retries: u32,

    /// Seconds to wait between attempts on the same file
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_RETRY_BACKOFF.as_secs())]
    pub retry_delay: u64,

    /// TOML file with defaults; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ask for settings not given by flags or config file
    #[arg(short, long)]
    pub interactive: bool,

    /// Where error reports are written
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub report_dir: PathBuf,

    /// Also write the error report as JSON
    #[arg(long)]
    pub json_report: bool,
}

impl Args {
    /// Download mode from `--exclude` / `--only`, if either was given.
    #[must_use]
    pub fn download_mode(&self) -> Option<DownloadMode> {
        let exclude = flatten_lists(&self.exclude);
        let only = flatten_lists(&self.only);
        if !exclude.is_empty() {
            Some(DownloadMode::Exclude(exclude))
        } else if !only.is_empty() {
            Some(DownloadMode::OnlyInclude(only))
        } else {
            None
        }
    }

    /// Ignored file-name patterns from `--ignore-types`.
    #[must_use]
    pub fn ignored_types(&self) -> Vec<String> {
        flatten_lists(&self.ignore_types)
    }

    /// Applies every flag that was given on top of `builder`.
    #[must_use]
    pub fn apply(&self, mut builder: CrawlConfigBuilder) -> CrawlConfigBuilder {
        if let Some(output) = &self.output {
            builder = builder.base_path(output.to_string_lossy());
        }
        if let Some(url) = &self.url {
            builder = builder.root_url(url.clone());
        }
        if let Some(mode) = self.download_mode() {
            builder = builder.mode(mode);
        }
        let ignored_types = self.ignored_types();
        if !ignored_types.is_empty() {
            builder = builder.ignored_types(ignored_types);
        }
        if let Some(concurrency) = self.concurrency {
            builder = builder.max_concurrency(usize::from(concurrency));
        }
        if let Some(layout) = self.layout {
            builder = builder.layout(layout);
        }
        builder
    }
}

fn flatten_lists(values: &[String]) -> Vec<String> {
    values.iter().flat_map(|value| split_list(value)).collect()
}
