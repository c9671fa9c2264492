//! Parser for the `#list` layout.
//!
//! ```html
//! <table id="list">
//!   <thead>...</thead>
//!   <tbody>
//!     <tr><td class="link"><a href="Art/">Art/</a></td><td class="size">-</td><td class="date">...</td></tr>
//!   </tbody>
//! </table>
//! ```

use scraper::{ElementRef, Html};
use tracing::trace;

use super::{
    ListedItem, ListingError, ListingLayout, ListingParser, anchor_link, element_text, has_class,
    parse_listing_date, selector,
};

/// Size text that marks a directory row.
const DIRECTORY_SIZE: &str = "-";

/// Parser for listings rendered as a `#list` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListParser;

impl ListingParser for ListParser {
    fn parse(&self, html: &str) -> Result<Vec<ListedItem>, ListingError> {
        let document = Html::parse_document(html);
        let container_selector = selector("#list")?;
        let container = document.select(&container_selector).next().ok_or(
            ListingError::MissingContainer {
                layout: ListingLayout::List,
            },
        )?;

        let Some(body) = container.children().filter_map(ElementRef::wrap).last() else {
            return Ok(Vec::new());
        };

        body.children()
            .filter_map(ElementRef::wrap)
            .filter(|row| row.inner_html().len() > 1)
            .map(parse_row)
            .collect()
    }
}

fn parse_row(row: ElementRef<'_>) -> Result<ListedItem, ListingError> {
    let cell = |class: &str| {
        row.children()
            .filter_map(ElementRef::wrap)
            .find(|cell| has_class(*cell, class))
    };

    let anchor = cell("link").and_then(|link| link.children().filter_map(ElementRef::wrap).next());
    let size = cell("size").map(element_text).filter(|size| !size.is_empty());

    let (Some(anchor), Some(size)) = (anchor, size) else {
        return Err(ListingError::invalid_item(row));
    };

    let item = ListedItem {
        name: anchor.text().collect(),
        link: anchor_link(anchor),
        is_file: size != DIRECTORY_SIZE,
        published_date: cell("date").and_then(|date| parse_listing_date(&element_text(date))),
        file_size: Some(size),
    };
    trace!(name = %item.name, link = %item.link, is_file = item.is_file, "parsed listing row");
    Ok(item)
}
