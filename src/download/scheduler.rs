//! Bounded-concurrency execution of one directory's downloads.
//!
//! The walker hands each directory's files to [`DownloadScheduler::run_batch`]
//! as a [`DownloadBatch`] and waits for it to drain before moving on.
//!
//! # Concurrency Model
//!
//! - Each file runs in its own Tokio task
//! - A semaphore permit is acquired before spawning each task
//! - Permits are released when tasks finish (RAII)
//! - A batch works under a child of the run's cancellation token; a task
//!   that exhausts its retries cancels that child so no new tasks start
//!   and retrying siblings stop, while the run's own token is untouched
//! - A panicking task is re-raised after the batch has drained
//!
//! # Retry Behavior
//!
//! Every error is retried with the fixed backoff of the [`RetryPolicy`].
//! Each failed attempt is recorded in the run's [`FailureLog`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::retry::{RetryDecision, RetryPolicy};
use super::{DownloadError, HttpClient};
use crate::error::CrawlError;
use crate::failure::FailureLog;
use crate::stats::RunStats;

/// One file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Remote file URL.
    pub url: String,
    /// Local destination.
    pub path: PathBuf,
}

/// The file tasks of one directory, keyed by remote URL.
///
/// Insertion order is kept. Inserting a URL that is already present
/// replaces its destination in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadBatch {
    tasks: Vec<DownloadTask>,
}

impl DownloadBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task, returning the destination it replaced, if any.
    pub fn insert(&mut self, url: impl Into<String>, path: impl Into<PathBuf>) -> Option<PathBuf> {
        let url = url.into();
        let path = path.into();
        if let Some(existing) = self.tasks.iter_mut().find(|task| task.url == url) {
            return Some(std::mem::replace(&mut existing.path, path));
        }
        self.tasks.push(DownloadTask { url, path });
        None
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when the batch has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl IntoIterator for DownloadBatch {
    type Item = DownloadTask;
    type IntoIter = std::vec::IntoIter<DownloadTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

/// What a successful task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    /// A non-empty file was already there.
    Skipped,
    /// The file was fetched; bytes written.
    Downloaded(u64),
}

/// Runs download batches with bounded concurrency and per-task retry.
#[derive(Debug)]
pub struct DownloadScheduler {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    max_concurrency: usize,
    retry_policy: RetryPolicy,
    client: HttpClient,
    failures: FailureLog,
    stats: Arc<RunStats>,
}

impl DownloadScheduler {
    /// Creates a scheduler allowing `max_concurrency` downloads in flight.
    ///
    /// A zero limit is raised to one.
    #[instrument(level = "debug", skip(retry_policy, client, failures, stats))]
    pub fn new(
        max_concurrency: usize,
        retry_policy: RetryPolicy,
        client: HttpClient,
        failures: FailureLog,
        stats: Arc<RunStats>,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);
        debug!(
            max_concurrency,
            max_attempts = retry_policy.max_attempts(),
            backoff_ms = retry_policy.backoff().as_millis(),
            "creating download scheduler"
        );
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            retry_policy,
            client,
            failures,
            stats,
        }
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Downloads every task in `batch`, at most `max_concurrency` at a time.
    ///
    /// Returns once every spawned task has finished.
    ///
    /// # Errors
    ///
    /// Returns the first [`CrawlError::Download`] of a task that ran out of
    /// retries, or [`CrawlError::Cancelled`] when `cancel` fired.
    #[instrument(skip(self, batch, cancel), fields(tasks = batch.len()))]
    pub async fn run_batch(
        &self,
        batch: DownloadBatch,
        cancel: &CancellationToken,
    ) -> Result<(), CrawlError> {
        if batch.is_empty() {
            return Ok(());
        }

        let batch_token = cancel.child_token();
        let mut handles = Vec::with_capacity(batch.len());

        for task in batch {
            let permit = tokio::select! {
                biased;
                () = batch_token.cancelled() => break,
                permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!(error = %e, "semaphore closed, not starting remaining downloads");
                        break;
                    }
                },
            };

            let client = self.client.clone();
            let retry_policy = self.retry_policy.clone();
            let failures = self.failures.clone();
            let stats = Arc::clone(&self.stats);
            let token = batch_token.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                download_with_retry(&client, &task, &retry_policy, &failures, &stats, &token).await
            }));
        }

        debug!(task_count = handles.len(), "waiting for downloads to complete");

        let aborted = match drain(handles).await {
            Drained::Failed(e) => return Err(e),
            Drained::Aborted => true,
            Drained::Completed => false,
        };
        if aborted || cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }
        Ok(())
    }
}

/// How a set of download tasks ended.
#[derive(Debug)]
enum Drained {
    /// Every task finished or stopped for cancellation.
    Completed,
    /// A task was aborted by the runtime before finishing.
    Aborted,
    /// The first fatal task error.
    Failed(CrawlError),
}

/// Awaits every handle. A panic in any task is re-raised once all
/// handles have been awaited.
async fn drain(handles: Vec<JoinHandle<Result<(), CrawlError>>>) -> Drained {
    let mut first_failure = None;
    let mut aborted = false;
    let mut panic_payload = None;

    for handle in handles {
        match handle.await {
            Ok(Ok(()) | Err(CrawlError::Cancelled)) => {}
            Ok(Err(e)) => {
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
            Err(e) if e.is_panic() => {
                error!(error = %e, "download task panicked");
                if panic_payload.is_none() {
                    panic_payload = Some(e.into_panic());
                }
            }
            Err(e) => {
                warn!(error = %e, "download task aborted");
                aborted = true;
            }
        }
    }

    if let Some(payload) = panic_payload {
        std::panic::resume_unwind(payload);
    }
    match first_failure {
        Some(e) => Drained::Failed(e),
        None if aborted => Drained::Aborted,
        None => Drained::Completed,
    }
}

/// Runs one task until it succeeds, is cancelled, or runs out of retries.
///
/// Running out of retries cancels `token` so the rest of the batch winds down.
async fn download_with_retry(
    client: &HttpClient,
    task: &DownloadTask,
    retry_policy: &RetryPolicy,
    failures: &FailureLog,
    stats: &RunStats,
    token: &CancellationToken,
) -> Result<(), CrawlError> {
    if token.is_cancelled() {
        return Err(CrawlError::Cancelled);
    }

    let mut attempt: u32 = 1;
    loop {
        match download_once(client, task).await {
            Ok(TaskOutcome::Skipped) => {
                debug!(path = %task.path.display(), "already downloaded, skipping");
                stats.increment_skipped();
                return Ok(());
            }
            Ok(TaskOutcome::Downloaded(bytes)) => {
                info!(url = %task.url, path = %task.path.display(), bytes, "download completed");
                stats.record_download(bytes);
                return Ok(());
            }
            Err(e) => {
                warn!(url = %task.url, attempt, error = %e, "download attempt failed");
                failures.record(&task.url, &task.path, attempt, &e);

                if token.is_cancelled() {
                    return Err(CrawlError::Cancelled);
                }

                match retry_policy.should_retry(attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        stats.increment_retried();
                        debug!(
                            url = %task.url,
                            next_attempt,
                            delay_ms = delay.as_millis(),
                            "retrying download"
                        );
                        tokio::select! {
                            () = token.cancelled() => return Err(CrawlError::Cancelled),
                            () = tokio::time::sleep(delay) => {}
                        }
                        attempt = next_attempt;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        error!(
                            url = %task.url,
                            path = %task.path.display(),
                            attempts = attempt,
                            reason = %reason,
                            "download failed after all attempts"
                        );
                        token.cancel();
                        return Err(CrawlError::Download {
                            url: task.url.clone(),
                            path: task.path.clone(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                }
            }
        }
    }
}

/// One attempt: prepare the directory, skip existing content, else stream.
async fn download_once(client: &HttpClient, task: &DownloadTask) -> Result<TaskOutcome, DownloadError> {
    if let Some(parent) = task.path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }

    if already_downloaded(&task.path).await {
        return Ok(TaskOutcome::Skipped);
    }

    let bytes = client.download_to_path(&task.url, &task.path).await?;
    Ok(TaskOutcome::Downloaded(bytes))
}

/// A non-empty file counts as done. Truncated files are not detected.
async fn already_downloaded(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_file() && metadata.len() > 0)
}
