//! Run configuration for a crawl.
//!
//! A [`CrawlConfig`] is built once through [`CrawlConfigBuilder`], validated,
//! and then shared read-only by the walker, the item filter, and the download
//! scheduler for the whole run.
//!
//! # Example
//!
//! ```
//! use listing_mirror::config::{CrawlConfig, DownloadMode};
//!
//! let config = CrawlConfig::builder()
//!     .base_path("/srv/mirror")
//!     .root_url("https://example.com/Books/")
//!     .mode(DownloadMode::OnlyInclude(vec!["Comics".to_string()]))
//!     .ignored_types(vec!["pdf".to_string()])
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_concurrency(), 5);
//! ```

mod file;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::filter::normalize_path;
use crate::listing::ListingLayout;

pub use file::{FileConfig, ModeSetting};

/// Remote root used when no URL is supplied.
pub const DEFAULT_ROOT_URL: &str = "https://thetrove.is/Books/";

/// Default number of concurrent downloads per directory batch.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound on concurrent downloads.
pub const MAX_CONCURRENCY: usize = 100;

/// Listing artifacts that are never traversed or downloaded.
pub const IGNORED_NAME_SENTINELS: [&str; 3] = ["Parent directory/", "?one", ".DS_Store"];

/// Errors raised while assembling a [`CrawlConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No local base path was supplied.
    #[error("invalid configuration: base path must not be blank")]
    BlankBasePath,

    /// The remote root is not an absolute http(s) URL.
    #[error("invalid configuration: root URL {url:?} is not an absolute http(s) URL")]
    InvalidRootUrl {
        /// The rejected URL.
        url: String,
    },

    /// Concurrency outside `1..=MAX_CONCURRENCY`.
    #[error(
        "invalid configuration: concurrency {value} must be between 1 and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// A configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML for [`FileConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// How the user-supplied folder list is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DownloadMode {
    /// Mirror everything.
    #[default]
    All,
    /// Skip entries with these exact names.
    Exclude(Vec<String>),
    /// Only traverse entries with these names, or anything below a URL containing one.
    OnlyInclude(Vec<String>),
}

/// Immutable configuration for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    base_path: PathBuf,
    root_url: String,
    ignored_names: Vec<String>,
    only_included_names: Vec<String>,
    ignored_types: Vec<String>,
    max_concurrency: usize,
    layout: ListingLayout,
}

impl CrawlConfig {
    /// Starts a new builder with default settings.
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::default()
    }

    /// Root of the local mirror.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Root of the remote listing tree.
    #[must_use]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Exact names that are never traversed or downloaded.
    #[must_use]
    pub fn ignored_names(&self) -> &[String] {
        &self.ignored_names
    }

    /// Allow-list of names; empty means everything is allowed.
    #[must_use]
    pub fn only_included_names(&self) -> &[String] {
        &self.only_included_names
    }

    /// Substrings that exclude a file name from download.
    #[must_use]
    pub fn ignored_types(&self) -> &[String] {
        &self.ignored_types
    }

    /// Maximum downloads in flight within one directory batch.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Markup strategy used to parse listing pages.
    #[must_use]
    pub fn layout(&self) -> ListingLayout {
        self.layout
    }
}

/// Builder for [`CrawlConfig`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct CrawlConfigBuilder {
    base_path: Option<String>,
    root_url: Option<String>,
    mode: DownloadMode,
    ignored_types: Vec<String>,
    max_concurrency: Option<usize>,
    layout: ListingLayout,
}

impl CrawlConfigBuilder {
    /// Sets the local mirror root.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Sets the remote root URL. Blank values keep the default.
    #[must_use]
    pub fn root_url(mut self, root_url: impl Into<String>) -> Self {
        let root_url = root_url.into();
        if !root_url.trim().is_empty() {
            self.root_url = Some(root_url.trim().to_string());
        }
        self
    }

    /// Sets how the folder list is applied.
    #[must_use]
    pub fn mode(mut self, mode: DownloadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the file-name substrings to skip.
    #[must_use]
    pub fn ignored_types(mut self, ignored_types: Vec<String>) -> Self {
        self.ignored_types = ignored_types;
        self
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    /// Sets the listing markup strategy.
    #[must_use]
    pub fn layout(mut self, layout: ListingLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Returns true when a base path has been supplied.
    #[must_use]
    pub fn has_base_path(&self) -> bool {
        self.base_path
            .as_deref()
            .is_some_and(|path| !path.trim().is_empty())
    }

    /// Validates the settings and produces the immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base path is blank, the root URL is
    /// not an absolute http(s) URL, or concurrency is out of range.
    pub fn build(self) -> Result<CrawlConfig, ConfigError> {
        let base_path = self
            .base_path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .ok_or(ConfigError::BlankBasePath)?;
        let base_path = normalize_path(Path::new(base_path));

        let root_url = self
            .root_url
            .unwrap_or_else(|| DEFAULT_ROOT_URL.to_string());
        match Url::parse(&root_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidRootUrl { url: root_url }),
        }

        let max_concurrency = self.max_concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if !(1..=MAX_CONCURRENCY).contains(&max_concurrency) {
            return Err(ConfigError::InvalidConcurrency {
                value: max_concurrency,
            });
        }

        let mut ignored_names: Vec<String> = IGNORED_NAME_SENTINELS
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut only_included_names = Vec::new();
        match self.mode {
            DownloadMode::All => {}
            DownloadMode::Exclude(names) => extend_unique(&mut ignored_names, names),
            DownloadMode::OnlyInclude(names) => extend_unique(&mut only_included_names, names),
        }

        let mut ignored_types = Vec::new();
        extend_unique(&mut ignored_types, self.ignored_types);

        let config = CrawlConfig {
            base_path,
            root_url,
            ignored_names,
            only_included_names,
            ignored_types,
            max_concurrency,
            layout: self.layout,
        };
        debug!(?config, "crawl configuration built");
        Ok(config)
    }
}

/// Splits comma-separated free text into trimmed, non-empty entries.
#[must_use]
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn extend_unique(target: &mut Vec<String>, entries: Vec<String>) {
    for entry in entries {
        let entry = entry.trim().to_string();
        if !entry.is_empty() && !target.contains(&entry) {
            target.push(entry);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn builder() -> CrawlConfigBuilder {
        CrawlConfig::builder().base_path("/srv/mirror")
    }

    #[test]
    fn test_build_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.base_path(), Path::new("/srv/mirror"));
        assert_eq!(config.root_url(), DEFAULT_ROOT_URL);
        assert_eq!(config.max_concurrency(), DEFAULT_CONCURRENCY);
        assert_eq!(config.layout(), ListingLayout::List);
        assert!(config.only_included_names().is_empty());
        assert!(config.ignored_types().is_empty());
        for sentinel in IGNORED_NAME_SENTINELS {
            assert!(config.ignored_names().iter().any(|n| n == sentinel));
        }
    }

    #[test]
    fn test_blank_base_path_rejected() {
        let result = CrawlConfig::builder().base_path("   ").build();
        assert!(matches!(result, Err(ConfigError::BlankBasePath)));

        let result = CrawlConfig::builder().build();
        assert!(matches!(result, Err(ConfigError::BlankBasePath)));
    }

    #[test]
    fn test_base_path_segments_trimmed() {
        let config = CrawlConfig::builder()
            .base_path(" /srv/ my mirror /books ")
            .build()
            .unwrap();
        assert_eq!(config.base_path(), Path::new("/srv/my mirror/books"));
    }

    #[test]
    fn test_blank_root_url_keeps_default() {
        let config = builder().root_url("  ").build().unwrap();
        assert_eq!(config.root_url(), DEFAULT_ROOT_URL);
    }

    #[test]
    fn test_non_http_root_url_rejected() {
        let result = builder().root_url("ftp://example.com/").build();
        assert!(matches!(result, Err(ConfigError::InvalidRootUrl { .. })));

        let result = builder().root_url("not a url").build();
        assert!(matches!(result, Err(ConfigError::InvalidRootUrl { .. })));
    }

    #[test]
    fn test_concurrency_bounds() {
        assert!(matches!(
            builder().max_concurrency(0).build(),
            Err(ConfigError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            builder().max_concurrency(101).build(),
            Err(ConfigError::InvalidConcurrency { value: 101 })
        ));
        assert_eq!(
            builder().max_concurrency(100).build().unwrap().max_concurrency(),
            100
        );
    }

    #[test]
    fn test_exclude_mode_extends_sentinels() {
        let config = builder()
            .mode(DownloadMode::Exclude(vec![
                "Maps".to_string(),
                " Art ".to_string(),
                "Maps".to_string(),
            ]))
            .build()
            .unwrap();
        let names = config.ignored_names();
        assert_eq!(names.len(), IGNORED_NAME_SENTINELS.len() + 2);
        assert!(names.contains(&"Maps".to_string()));
        assert!(names.contains(&"Art".to_string()));
        assert!(config.only_included_names().is_empty());
    }

    #[test]
    fn test_only_include_mode_sets_allow_list() {
        let config = builder()
            .mode(DownloadMode::OnlyInclude(vec!["Comics".to_string()]))
            .build()
            .unwrap();
        assert_eq!(config.only_included_names(), ["Comics".to_string()]);
        assert_eq!(config.ignored_names().len(), IGNORED_NAME_SENTINELS.len());
    }

    #[test]
    fn test_split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list(" pdf, .zip ,, epub "),
            vec!["pdf".to_string(), ".zip".to_string(), "epub".to_string()]
        );
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn test_config_error_display() {
        let msg = ConfigError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid configuration"));
        assert!(msg.contains("100"));
    }
}
