//! HTTP fetching and bounded-concurrency downloading.
//!
//! - [`HttpClient`] fetches listing pages and streams files to disk
//! - [`DownloadScheduler`] runs one directory's [`DownloadBatch`] with a
//!   semaphore-gated pool of Tokio tasks
//! - [`RetryPolicy`] decides whether a failed file is tried again
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use listing_mirror::download::{DownloadBatch, DownloadScheduler, HttpClient, RetryPolicy};
//! use listing_mirror::failure::FailureLog;
//! use listing_mirror::stats::RunStats;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = DownloadScheduler::new(
//!     5,
//!     RetryPolicy::default(),
//!     HttpClient::new(),
//!     FailureLog::new(),
//!     Arc::new(RunStats::new()),
//! );
//! let mut batch = DownloadBatch::new();
//! batch.insert("https://example.com/Books/cover.jpg", "/srv/mirror/cover.jpg");
//! scheduler.run_batch(batch, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod retry;
mod scheduler;

pub use client::HttpClient;
pub use constants::{CONNECT_TIMEOUT_SECS, IDLE_READ_TIMEOUT_SECS};
pub use error::DownloadError;
pub use retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF, RetryDecision, RetryPolicy};
pub use scheduler::{DownloadBatch, DownloadScheduler, DownloadTask};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
