//! Directory-listing parsing.
//!
//! Listing pages come in more than one markup shape. Each shape is a
//! [`ListingLayout`] with its own [`ListingParser`]; the walker picks the
//! parser from configuration and only ever sees [`ListedItem`]s.
//!
//! # Example
//!
//! ```
//! use listing_mirror::listing::ListingLayout;
//!
//! let html = r#"<table id="list"><tbody>
//!   <tr><td class="link"><a href="Art/">Art/</a></td><td class="size">-</td><td class="date">2021-Mar-04 10:12</td></tr>
//!   <tr><td class="link"><a href="cover.jpg">cover.jpg</a></td><td class="size">1.2 MiB</td><td class="date">2021-Mar-04 10:12</td></tr>
//! </tbody></table>"#;
//!
//! let items = ListingLayout::List.parser().parse(html).unwrap();
//! assert_eq!(items.len(), 2);
//! assert!(!items[0].is_file);
//! assert!(items[1].is_file);
//! ```

mod date;
mod list;
mod litem;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use date::parse_listing_date;
pub use list::ListParser;
pub use litem::LitemTableParser;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    /// Display name as rendered; may carry mangled bytes shown as `?`.
    pub name: String,
    /// Link fragment, usually relative to the listing URL.
    pub link: String,
    /// True for a downloadable file, false for a subdirectory.
    pub is_file: bool,
    /// Raw size text.
    pub file_size: Option<String>,
    /// Best-effort parse of the date column.
    pub published_date: Option<NaiveDateTime>,
}

/// Errors raised while parsing a listing page.
#[derive(Debug, Clone, Error)]
pub enum ListingError {
    /// The page has no listing container for the configured layout.
    #[error("listing container not found ({layout} layout)")]
    MissingContainer {
        /// Layout that was expected.
        layout: ListingLayout,
    },

    /// A row lacks the cells every entry must carry.
    #[error("invalid listing item: {row_html}")]
    InvalidItem {
        /// Markup of the offending row.
        row_html: String,
    },

    /// A built-in selector failed to compile.
    #[error("invalid selector {selector:?}: {reason}")]
    Selector {
        /// The selector text.
        selector: &'static str,
        /// Parser message.
        reason: String,
    },
}

impl ListingError {
    /// Creates an `InvalidItem` error from the row element.
    #[must_use]
    pub fn invalid_item(row: ElementRef<'_>) -> Self {
        Self::InvalidItem {
            row_html: row.inner_html().trim().to_string(),
        }
    }
}

/// Parses listing markup into entries, in listing order.
pub trait ListingParser {
    /// Parses a full listing page.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError`] when the container is missing or a row is malformed.
    fn parse(&self, html: &str) -> Result<Vec<ListedItem>, ListingError>;
}

/// Markup shape of the listing pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingLayout {
    /// `#list` table with `link`, `size` and `date` cells.
    #[default]
    List,
    /// Table rows with `litem_name` cells; `litem_dir` marks directories.
    LitemTable,
}

impl ListingLayout {
    /// Returns the parser for this layout.
    #[must_use]
    pub fn parser(self) -> Box<dyn ListingParser + Send + Sync> {
        match self {
            Self::List => Box::new(ListParser),
            Self::LitemTable => Box::new(LitemTableParser),
        }
    }

    /// Name used on the command line and in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::LitemTable => "litem-table",
        }
    }
}

impl fmt::Display for ListingLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized layout name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown listing layout '{0}' (expected 'list' or 'litem-table')")]
pub struct UnknownLayout(pub String);

impl FromStr for ListingLayout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "litem-table" | "litem_table" | "litem" => Ok(Self::LitemTable),
            _ => Err(UnknownLayout(s.to_string())),
        }
    }
}

fn selector(text: &'static str) -> Result<Selector, ListingError> {
    Selector::parse(text).map_err(|e| ListingError::Selector {
        selector: text,
        reason: e.to_string(),
    })
}

/// Text content of an element, whitespace-trimmed.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Link target of an anchor: `href`, else its first attribute.
fn anchor_link(anchor: ElementRef<'_>) -> String {
    anchor
        .value()
        .attr("href")
        .or_else(|| anchor.value().attrs().next().map(|(_, value)| value))
        .unwrap_or_default()
        .to_string()
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}
