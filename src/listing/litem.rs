//! Parser for the `litem_*` table layout.
//!
//! ```html
//! <table>
//!   <tr><td class="litem_name litem_dir"><a href="Art/">Art</a></td><td class="litem_size">-</td><td class="litem_date">...</td></tr>
//!   <tr><td class="litem_name litem_file"><a href="cover.jpg">cover.jpg</a></td><td class="litem_size">1.2 MiB</td></tr>
//! </table>
//! ```

use scraper::{ElementRef, Html};
use tracing::trace;

use super::{
    ListedItem, ListingError, ListingLayout, ListingParser, anchor_link, element_text, has_class,
    parse_listing_date, selector,
};

const DIRECTORY_CLASS: &str = "litem_dir";

/// Parser for listings rendered as `litem_name` table rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct LitemTableParser;

impl ListingParser for LitemTableParser {
    fn parse(&self, html: &str) -> Result<Vec<ListedItem>, ListingError> {
        let document = Html::parse_document(html);
        let table_selector = selector("table")?;
        let row_selector = selector("tr")?;
        let name_selector = selector("td.litem_name")?;
        let size_selector = selector("td.litem_size")?;
        let date_selector = selector("td.litem_date")?;
        let anchor_selector = selector("a")?;

        if document.select(&table_selector).next().is_none() {
            return Err(ListingError::MissingContainer {
                layout: ListingLayout::LitemTable,
            });
        }

        let mut items = Vec::new();
        for row in document.select(&row_selector) {
            let Some(name_cell) = row.select(&name_selector).next() else {
                continue;
            };
            let Some(anchor) = name_cell.select(&anchor_selector).next() else {
                return Err(ListingError::invalid_item(row));
            };

            let item = ListedItem {
                name: anchor.text().collect(),
                link: anchor_link(anchor),
                is_file: !has_class(name_cell, DIRECTORY_CLASS) && !has_class(row, DIRECTORY_CLASS),
                file_size: optional_text(row.select(&size_selector).next()),
                published_date: optional_text(row.select(&date_selector).next())
                    .and_then(|date| parse_listing_date(&date)),
            };
            trace!(name = %item.name, link = %item.link, is_file = item.is_file, "parsed litem row");
            items.push(item);
        }
        Ok(items)
    }
}

fn optional_text(cell: Option<ElementRef<'_>>) -> Option<String> {
    cell.map(element_text).filter(|text| !text.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_class_distinguishes_rows() {
        let html = r#"<html><body><table>
            <tr><th>Name</th><th>Size</th></tr>
            <tr><td class="litem_name litem_dir"><a href="Art/">Art</a></td><td class="litem_size">-</td><td class="litem_date">2021-03-04 10:12</td></tr>
            <tr><td class="litem_name litem_file"><a href="cover.jpg">cover.jpg</a></td><td class="litem_size">1.2 MiB</td></tr>
        </table></body></html>"#;

        let items = LitemTableParser.parse(html).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].name, "Art");
        assert_eq!(items[0].link, "Art/");
        assert!(!items[0].is_file);
        assert!(items[0].published_date.is_some());

        assert_eq!(items[1].name, "cover.jpg");
        assert!(items[1].is_file);
        assert_eq!(items[1].file_size.as_deref(), Some("1.2 MiB"));
        assert_eq!(items[1].published_date, None);
    }

    #[test]
    fn test_name_cell_without_anchor_is_invalid() {
        let html = r#"<table><tr><td class="litem_name">orphan</td></tr></table>"#;
        assert!(matches!(
            LitemTableParser.parse(html),
            Err(ListingError::InvalidItem { .. })
        ));
    }

    #[test]
    fn test_page_without_table_is_missing_container() {
        let html = "<html><body><ul><li>nothing</li></ul></body></html>";
        assert!(matches!(
            LitemTableParser.parse(html),
            Err(ListingError::MissingContainer {
                layout: ListingLayout::LitemTable
            })
        ));
    }
}
