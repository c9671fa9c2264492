//! Date column parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%b-%d %H:%M",
    "%d-%b-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Best-effort parse of a listing date cell.
///
/// Returns `None` for blank or unrecognized text; a bad date never fails a listing.
#[must_use]
pub fn parse_listing_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
