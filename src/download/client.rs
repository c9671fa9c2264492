//! HTTP client wrapper for listing fetches and streaming file downloads.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, IDLE_READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// HTTP client shared by the walker and every download task.
///
/// Cloning is cheap; all clones share one connection pool.
///
/// # Example
///
/// ```no_run
/// use listing_mirror::download::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let html = client.fetch_page("https://example.com/Books/").await?;
/// println!("{} bytes of listing", html.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, IDLE_READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// `idle_read_timeout_secs` bounds each wait for response data, not the
    /// whole transfer.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the supplied timeouts.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, idle_read_timeout_secs: u64) -> Self {
        let client = base_client_builder(connect_timeout_secs, idle_read_timeout_secs)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Fetches a listing page and returns its body as text.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` on transport failure, timeout, or a non-2xx status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<String, DownloadError> {
        let response = self.send_get(url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        debug!(bytes = body.len(), "listing page fetched");
        Ok(body)
    }

    /// Streams `url` into the file at `path`, returning the bytes written.
    ///
    /// The file is created when absent and written in place otherwise. A
    /// failed stream leaves whatever was written on disk.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` on transport failure, non-2xx status, or
    /// when the file cannot be opened or written.
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self.send_get(url).await?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        let bytes = stream_to_file(file, response, url, path).await?;
        debug!(bytes, "download streamed to disk");
        Ok(bytes)
    }

    async fn send_get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let parsed = url::Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Streams the response body into `file`, returning bytes written.
async fn stream_to_file(
    file: tokio::fs::File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

fn base_client_builder(connect_timeout_secs: u64, idle_read_timeout_secs: u64) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .read_timeout(Duration::from_secs(idle_read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}
