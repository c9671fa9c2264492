//! Run counters shared by the walker and download tasks.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Counters for one crawl run.
///
/// Updated concurrently from download tasks; read with [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct RunStats {
    directories: AtomicUsize,
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    retried: AtomicUsize,
    bytes: AtomicU64,
}

impl RunStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_directories(&self) {
        self.directories.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_download(&self, bytes: u64) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            directories: self.directories.load(Ordering::SeqCst),
            downloaded: self.downloaded.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            retried: self.retried.load(Ordering::SeqCst),
            bytes: self.bytes.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of [`RunStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Listing pages visited.
    pub directories: usize,
    /// Files fetched in this run.
    pub downloaded: usize,
    /// Files left alone because a non-empty copy existed.
    pub skipped: usize,
    /// Retry attempts across all files.
    pub retried: usize,
    /// Bytes written to disk.
    pub bytes: u64,
}
