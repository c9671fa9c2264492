//! Retry policy for failed file downloads.
//!
//! Downloads are retried after any failure with a fixed backoff between
//! attempts. Listing page fetches are never retried; a broken listing aborts
//! the crawl instead.
//!
//! # Example
//!
//! ```
//! use listing_mirror::download::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default pause between attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Decision on whether to retry a failed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the download after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the download.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Fixed-backoff retry configuration.
///
/// With defaults a task makes at most 11 attempts (1 + 10 retries), pausing
/// 5 seconds after each failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    max_retries: u32,

    /// Pause between attempts.
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom retry count and backoff.
    #[must_use]
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns the number of retries allowed after the initial attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the total number of attempts a task may make.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the pause between attempts.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts()))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts() {
            debug!(attempt, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts()),
            };
        }

        RetryDecision::Retry {
            delay: self.backoff,
            attempt: attempt + 1,
        }
    }
}
