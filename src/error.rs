//! Terminal errors of a crawl run.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::download::DownloadError;
use crate::listing::ListingError;

/// Error that ends a crawl run.
///
/// Everything except [`CrawlError::Cancelled`] is a failure worth a report.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A listing page could not be fetched.
    #[error("failed to fetch listing {url}: {source}")]
    Fetch {
        /// Listing URL.
        url: String,
        /// Fetch failure.
        #[source]
        source: DownloadError,
    },

    /// A listing page could not be parsed.
    #[error("failed to parse listing {url}: {source}")]
    Listing {
        /// Listing URL.
        url: String,
        /// Parse failure.
        #[source]
        source: ListingError,
    },

    /// Configuration was rejected before crawling started.
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigError),

    /// A file kept failing until the retry budget ran out.
    #[error("download of {url} to {path} failed after {attempts} attempts: {source}")]
    Download {
        /// Remote file URL.
        url: String,
        /// Local destination.
        path: PathBuf,
        /// Attempts made, including the first.
        attempts: u32,
        /// Failure of the last attempt.
        #[source]
        source: DownloadError,
    },

    /// The run was cancelled.
    #[error("crawl cancelled")]
    Cancelled,
}

impl CrawlError {
    /// Creates a listing fetch error.
    pub fn fetch(url: impl Into<String>, source: DownloadError) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }

    /// Creates a listing parse error.
    pub fn listing(url: impl Into<String>, source: ListingError) -> Self {
        Self::Listing {
            url: url.into(),
            source,
        }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Listing {
                source: ListingError::InvalidItem { .. },
                ..
            } => "invalid_listing_item",
            Self::Listing { .. } => "listing",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::Download { .. } => "download",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true for cooperative cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
