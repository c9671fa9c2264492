//! Failure tracking and diagnostic reports for aborted runs.
//!
//! Download tasks record every failed attempt into a shared [`FailureLog`].
//! When a run ends in error, [`FailureReport`] bundles the configuration,
//! the last recorded download failure, and the terminating error's cause
//! chain into something a user can attach to a bug report.

use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CrawlConfig;
use crate::download::DownloadError;
use crate::error::CrawlError;
use crate::listing::ListingError;

/// One link of an error's cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorLink {
    /// `Display` output.
    pub message: String,
    /// `Debug` output.
    pub debug: String,
}

/// Walks `error` and its sources, outermost first.
#[must_use]
pub fn error_chain(error: &(dyn StdError + 'static)) -> Vec<ErrorLink> {
    let mut chain = Vec::new();
    let mut current = Some(error);
    while let Some(link) = current {
        chain.push(ErrorLink {
            message: link.to_string(),
            debug: format!("{link:?}"),
        });
        current = link.source();
    }
    chain
}

/// A single failed download attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadFailure {
    /// Remote file URL.
    pub url: String,
    /// Local destination.
    pub path: PathBuf,
    /// Attempt number that failed, starting at 1.
    pub attempt: u32,
    /// When the failure was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Cause chain of the failure.
    pub chain: Vec<ErrorLink>,
}

/// Keeps the most recent download failure of a run.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    last: Arc<Mutex<Option<DownloadFailure>>>,
}

impl FailureLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the last failure with this one.
    pub fn record(&self, url: &str, path: &Path, attempt: u32, error: &DownloadError) {
        let failure = DownloadFailure {
            url: url.to_string(),
            path: path.to_path_buf(),
            attempt,
            recorded_at: Utc::now(),
            chain: error_chain(error),
        };
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(failure);
    }

    /// Forgets the recorded failure.
    pub(crate) fn clear(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns a copy of the last failure, if any.
    #[must_use]
    pub fn last(&self) -> Option<DownloadFailure> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The run configuration as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    /// Local mirror root.
    pub base_path: String,
    /// Remote listing root.
    pub root_url: String,
    /// Concurrency limit.
    pub max_concurrency: usize,
    /// Listing layout name.
    pub layout: String,
    /// Exact names never visited.
    pub ignored_names: Vec<String>,
    /// Allow-list of names.
    pub only_included_names: Vec<String>,
    /// File-name substrings skipped.
    pub ignored_types: Vec<String>,
}

impl From<&CrawlConfig> for ConfigSnapshot {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            base_path: config.base_path().display().to_string(),
            root_url: config.root_url().to_string(),
            max_concurrency: config.max_concurrency(),
            layout: config.layout().to_string(),
            ignored_names: config.ignored_names().to_vec(),
            only_included_names: config.only_included_names().to_vec(),
            ignored_types: config.ignored_types().to_vec(),
        }
    }
}

/// User-facing explanation of a terminating error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailureDescriptor {
    /// What went wrong.
    pub what: &'static str,
    /// What to try next.
    pub fix: &'static str,
}

/// Describes a terminating error for humans.
#[must_use]
pub fn describe(error: &CrawlError) -> FailureDescriptor {
    match error {
        CrawlError::Fetch {
            source: DownloadError::HttpStatus { status: 404, .. },
            ..
        } => FailureDescriptor {
            what: "Listing page not found",
            fix: "Check the root URL; folder names are case-sensitive on most servers.",
        },
        CrawlError::Fetch { .. } => FailureDescriptor {
            what: "Listing page could not be fetched",
            fix: "Check connectivity and the root URL, then rerun; finished files are skipped.",
        },
        CrawlError::Listing {
            source: ListingError::MissingContainer { .. },
            ..
        } => FailureDescriptor {
            what: "Page is not a recognised directory listing",
            fix: "Make sure the URL points at a folder, or try another --layout.",
        },
        CrawlError::Listing { .. } => FailureDescriptor {
            what: "Listing row could not be read",
            fix: "The listing markup changed; try another --layout or report the page.",
        },
        CrawlError::InvalidConfiguration(_) => FailureDescriptor {
            what: "Configuration rejected",
            fix: "Fix the reported setting on the command line or in the config file.",
        },
        CrawlError::Download { .. } => FailureDescriptor {
            what: "File kept failing to download",
            fix: "Rerun later; files already on disk are skipped.",
        },
        CrawlError::Cancelled => FailureDescriptor {
            what: "Run was cancelled",
            fix: "Rerun to resume; files already on disk are skipped.",
        },
    }
}

/// Diagnostic record for a failed run.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    /// When the report was built.
    pub generated_at: DateTime<Utc>,
    /// Operating system name.
    pub os: &'static str,
    /// OS family.
    pub os_family: &'static str,
    /// CPU architecture.
    pub arch: &'static str,
    /// Version of this crate.
    pub crate_version: &'static str,
    /// Configuration of the run.
    pub config: ConfigSnapshot,
    /// Most recent failed download attempt.
    pub last_download_failure: Option<DownloadFailure>,
    /// Kind of the terminating error.
    pub error_kind: &'static str,
    /// Explanation of the terminating error.
    pub descriptor: FailureDescriptor,
    /// Cause chain of the terminating error.
    pub error_chain: Vec<ErrorLink>,
    /// Backtrace captured when the report was built.
    pub backtrace: String,
}

impl FailureReport {
    /// Builds a report for `error`.
    #[must_use]
    pub fn new(error: &CrawlError, config: &CrawlConfig, failures: &FailureLog) -> Self {
        Self {
            generated_at: Utc::now(),
            os: std::env::consts::OS,
            os_family: std::env::consts::FAMILY,
            arch: std::env::consts::ARCH,
            crate_version: env!("CARGO_PKG_VERSION"),
            config: ConfigSnapshot::from(config),
            last_download_failure: failures.last(),
            error_kind: error.kind(),
            descriptor: describe(error),
            error_chain: error_chain(error),
            backtrace: std::backtrace::Backtrace::capture().to_string(),
        }
    }

    /// File name stem for the report, e.g. `Error-20240131-101500`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("Error-{}", self.generated_at.format("%Y%m%d-%H%M%S"))
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which in practice does not happen.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn list_or_none(entries: &[String]) -> String {
    if entries.is_empty() {
        "(none)".to_string()
    } else {
        entries.join(", ")
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, chain: &[ErrorLink]) -> fmt::Result {
    for (depth, link) in chain.iter().enumerate() {
        writeln!(f, "  [{depth}] {}", link.message)?;
        writeln!(f, "      {}", link.debug)?;
    }
    Ok(())
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== listing-mirror failure report ====")?;
        writeln!(f, "Generated: {}", self.generated_at.to_rfc3339())?;
        writeln!(f, "OS: {} ({})", self.os, self.os_family)?;
        writeln!(f, "Architecture: {}", self.arch)?;
        writeln!(f, "Version: {}", self.crate_version)?;

        writeln!(f)?;
        writeln!(f, "---- Configuration ----")?;
        writeln!(f, "Base path: {}", self.config.base_path)?;
        writeln!(f, "Root URL: {}", self.config.root_url)?;
        writeln!(f, "Max concurrency: {}", self.config.max_concurrency)?;
        writeln!(f, "Layout: {}", self.config.layout)?;
        writeln!(f, "Ignored names: {}", list_or_none(&self.config.ignored_names))?;
        writeln!(
            f,
            "Only included names: {}",
            list_or_none(&self.config.only_included_names)
        )?;
        writeln!(f, "Ignored types: {}", list_or_none(&self.config.ignored_types))?;

        writeln!(f)?;
        writeln!(f, "---- Last download error ----")?;
        match &self.last_download_failure {
            Some(failure) => {
                writeln!(f, "URL: {}", failure.url)?;
                writeln!(f, "Path: {}", failure.path.display())?;
                writeln!(f, "Attempt: {}", failure.attempt)?;
                writeln!(f, "At: {}", failure.recorded_at.to_rfc3339())?;
                write_chain(f, &failure.chain)?;
            }
            None => writeln!(f, "(none)")?,
        }

        writeln!(f)?;
        writeln!(f, "---- Main error ----")?;
        writeln!(f, "Kind: {}", self.error_kind)?;
        writeln!(f, "What: {}", self.descriptor.what)?;
        writeln!(f, "Fix: {}", self.descriptor.fix)?;
        write_chain(f, &self.error_chain)?;

        writeln!(f)?;
        writeln!(f, "---- Backtrace ----")?;
        writeln!(f, "{}", self.backtrace)
    }
}
