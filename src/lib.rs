//! listing-mirror core library
//!
//! Recursively mirrors a web directory listing to a local folder. The engine
//! walks listing pages depth-first, filters entries by name and type, and
//! downloads each folder's files with bounded concurrency and per-file retry.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Validated, immutable run configuration and TOML file support
//! - [`listing`] - Listing page parsers, one per markup layout
//! - [`filter`] - Item filtering and local name/path handling
//! - [`crawl`] - The depth-first walker and the [`Crawler`] entry point
//! - [`download`] - HTTP client, retry policy, and the download scheduler
//! - [`failure`] - Failure log and diagnostic reports
//! - [`stats`] - Run counters

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crawl;
pub mod download;
pub mod error;
pub mod failure;
pub mod filter;
pub mod listing;
pub mod stats;
mod user_agent;

// Re-export commonly used types
pub use config::{CrawlConfig, CrawlConfigBuilder, DownloadMode};
pub use crawl::Crawler;
pub use download::{DownloadBatch, DownloadScheduler, HttpClient, RetryPolicy};
pub use error::CrawlError;
pub use failure::{FailureLog, FailureReport};
pub use listing::{ListedItem, ListingLayout, ListingParser};
pub use stats::{RunStats, StatsSnapshot};
