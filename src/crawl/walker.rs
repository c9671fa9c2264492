//! Depth-first traversal of the listing tree.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::download::{DownloadBatch, DownloadError, DownloadScheduler, HttpClient};
use crate::error::CrawlError;
use crate::filter::{decode_file_name, is_ignored_type, is_valid_item, join_segment};
use crate::listing::ListingParser;
use crate::stats::RunStats;

/// Resolves a listing link against the directory it appeared in.
///
/// The directory URL is treated as a directory even without a trailing
/// `/`. Absolute links are honored.
///
/// ```
/// use listing_mirror::crawl::child_url;
///
/// assert_eq!(
///     child_url("https://example.com/Books", "Art/").unwrap(),
///     "https://example.com/Books/Art/"
/// );
/// ```
///
/// # Errors
///
/// Returns [`DownloadError::InvalidUrl`] when either part cannot form a URL.
pub fn child_url(directory_url: &str, link: &str) -> Result<String, DownloadError> {
    let base = if directory_url.ends_with('/') {
        Url::parse(directory_url)
    } else {
        Url::parse(&format!("{directory_url}/"))
    }
    .map_err(|_| DownloadError::invalid_url(directory_url))?;

    base.join(link.trim())
        .map(String::from)
        .map_err(|_| DownloadError::invalid_url(link))
}

/// State shared by every level of one traversal.
pub(crate) struct Walker<'a> {
    pub(crate) config: &'a CrawlConfig,
    pub(crate) client: &'a HttpClient,
    pub(crate) parser: Box<dyn ListingParser + Send + Sync>,
    pub(crate) scheduler: DownloadScheduler,
    pub(crate) stats: Arc<RunStats>,
}

impl Walker<'_> {
    /// Visits `url`, recursing into subdirectories as they are met, then
    /// downloads this directory's files before returning.
    pub(crate) fn walk<'s>(
        &'s self,
        url: String,
        local_dir: PathBuf,
        cancel: &'s CancellationToken,
    ) -> BoxFuture<'s, Result<(), CrawlError>> {
        let span = info_span!("walk", url = %url);
        Box::pin(
            async move {
                if cancel.is_cancelled() {
                    return Err(CrawlError::Cancelled);
                }

                info!(local_dir = %local_dir.display(), "loading page");
                let html = self
                    .client
                    .fetch_page(&url)
                    .await
                    .map_err(|e| CrawlError::fetch(&url, e))?;
                let items = self
                    .parser
                    .parse(&html)
                    .map_err(|e| CrawlError::listing(&url, e))?;
                self.stats.increment_directories();
                debug!(items = items.len(), "listing parsed");

                let mut batch = DownloadBatch::new();
                for item in items {
                    if cancel.is_cancelled() {
                        info!("cancelled, abandoning directory");
                        return Err(CrawlError::Cancelled);
                    }

                    info!(name = %item.name, is_file = item.is_file, "checking item");
                    if !is_valid_item(&item, &url, self.config) {
                        debug!(name = %item.name, "item filtered out");
                        continue;
                    }

                    let target_url =
                        child_url(&url, &item.link).map_err(|e| CrawlError::fetch(&url, e))?;
                    let local_name = decode_file_name(&item.name);

                    if item.is_file {
                        if is_ignored_type(&item.name, self.config) {
                            debug!(name = %local_name, "ignored file type");
                            continue;
                        }
                        if local_name.is_empty() {
                            warn!(name = %item.name, "file name is blank after decoding, skipping");
                            continue;
                        }
                        let path = join_segment(&local_dir, &local_name);
                        if let Some(previous) = batch.insert(target_url, path) {
                            warn!(
                                name = %item.name,
                                previous = %previous.display(),
                                "duplicate link in listing, keeping the later entry"
                            );
                        }
                    } else {
                        let child_dir = join_segment(&local_dir, &local_name);
                        self.walk(target_url, child_dir, cancel).await?;
                    }
                }

                self.scheduler.run_batch(batch, cancel).await
            }
            .instrument(span),
        )
    }
}
