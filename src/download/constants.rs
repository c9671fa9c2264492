//! Constants for the download module (timeouts).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Longest pause allowed between two reads of a response (5 minutes).
///
/// There is no limit on a whole transfer; large archives may stream for hours.
pub const IDLE_READ_TIMEOUT_SECS: u64 = 300;
