//! The crawl-and-download engine.
//!
//! A [`Crawler`] walks the listing tree depth-first from the configured root.
//! Files found in a directory are collected into a batch that is downloaded,
//! with bounded concurrency, before the walk returns to the parent directory.
//!
//! # Example
//!
//! ```no_run
//! use listing_mirror::config::CrawlConfig;
//! use listing_mirror::crawl::Crawler;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CrawlConfig::builder()
//!     .base_path("/srv/mirror")
//!     .root_url("https://example.com/Books/")
//!     .build()?;
//! let crawler = Crawler::new(config);
//!
//! match crawler.run(&CancellationToken::new()).await {
//!     Ok(stats) => println!("downloaded {} files", stats.downloaded),
//!     Err(error) => eprintln!("{}", crawler.failure_report(&error)),
//! }
//! # Ok(())
//! # }
//! ```

mod walker;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::CrawlConfig;
use crate::download::{DownloadScheduler, HttpClient, RetryPolicy};
use crate::error::CrawlError;
use crate::failure::{FailureLog, FailureReport};
use crate::stats::{RunStats, StatsSnapshot};

pub use walker::child_url;
use walker::Walker;

/// Runs crawls for one configuration.
#[derive(Debug)]
pub struct Crawler {
    config: Arc<CrawlConfig>,
    client: HttpClient,
    retry_policy: RetryPolicy,
    failures: FailureLog,
}

impl Crawler {
    /// Creates a crawler with the default HTTP client and retry policy.
    #[must_use]
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: HttpClient::new(),
            retry_policy: RetryPolicy::default(),
            failures: FailureLog::new(),
        }
    }

    /// Replaces the retry policy for file downloads.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Mirrors the whole tree below the root URL.
    ///
    /// Resolves once every directory has been visited and every file
    /// attempted. Failures recorded by an earlier run are forgotten.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Cancelled`] when `cancel` fires, and any other
    /// [`CrawlError`] for a listing that cannot be fetched or parsed or a
    /// file that runs out of retries.
    #[instrument(skip(self, cancel), fields(root_url = %self.config.root_url()))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<StatsSnapshot, CrawlError> {
        self.failures.clear();
        let stats = Arc::new(RunStats::new());
        let walker = Walker {
            config: self.config.as_ref(),
            client: &self.client,
            parser: self.config.layout().parser(),
            scheduler: DownloadScheduler::new(
                self.config.max_concurrency(),
                self.retry_policy.clone(),
                self.client.clone(),
                self.failures.clone(),
                Arc::clone(&stats),
            ),
            stats: Arc::clone(&stats),
        };

        info!(
            base_path = %self.config.base_path().display(),
            max_concurrency = self.config.max_concurrency(),
            layout = %self.config.layout(),
            "starting crawl"
        );

        let result = walker
            .walk(
                self.config.root_url().to_string(),
                self.config.base_path().to_path_buf(),
                cancel,
            )
            .await;

        let snapshot = stats.snapshot();
        match &result {
            Ok(()) => info!(
                directories = snapshot.directories,
                downloaded = snapshot.downloaded,
                skipped = snapshot.skipped,
                retried = snapshot.retried,
                bytes = snapshot.bytes,
                "crawl complete"
            ),
            Err(CrawlError::Cancelled) => warn!(
                directories = snapshot.directories,
                downloaded = snapshot.downloaded,
                "crawl cancelled"
            ),
            Err(e) => warn!(error = %e, kind = e.kind(), "crawl aborted"),
        }
        result.map(|()| snapshot)
    }

    /// Builds the diagnostic report for a failed run.
    #[must_use]
    pub fn failure_report(&self, error: &CrawlError) -> FailureReport {
        FailureReport::new(error, &self.config, &self.failures)
    }
}
