//! Item classification and local name handling.
//!
//! Decides which listing entries are traversed or downloaded, and turns
//! remote display names into safe local path segments.

mod name;
mod path;

use crate::config::CrawlConfig;
use crate::listing::ListedItem;

pub use name::decode_file_name;
pub use path::{join_segment, normalize_path};

/// Returns true when `item` should be traversed (directory) or considered
/// for download (file).
///
/// All of the following must hold:
/// 1. the name is not in the ignored names (exact match);
/// 2. with a non-empty allow-list, the name matches an entry
///    case-insensitively, or the decoded `current_url` contains one;
/// 3. the link is not blank.
#[must_use]
pub fn is_valid_item(item: &ListedItem, current_url: &str, config: &CrawlConfig) -> bool {
    if config.ignored_names().iter().any(|name| *name == item.name) {
        return false;
    }
    if item.link.trim().is_empty() {
        return false;
    }

    let allowed = config.only_included_names();
    if allowed.is_empty() {
        return true;
    }

    let item_name = directory_name(&item.name).to_lowercase();
    if allowed
        .iter()
        .any(|entry| directory_name(entry).to_lowercase() == item_name)
    {
        return true;
    }

    let current_url = decode_url(current_url).to_lowercase();
    allowed
        .iter()
        .any(|entry| current_url.contains(&entry.to_lowercase()))
}

/// Returns true when the decoded file name contains any ignored type as a
/// raw substring.
#[must_use]
pub fn is_ignored_type(name: &str, config: &CrawlConfig) -> bool {
    let decoded = decode_file_name(name);
    config
        .ignored_types()
        .iter()
        .any(|ignored| decoded.contains(ignored.as_str()))
}

/// Listing directory names end in `/`; compare without it.
fn directory_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed)
}

/// Percent-decodes `url` with `+` as space. Escapes that are not UTF-8
/// become U+FFFD instead of failing the whole decode.
fn decode_url(url: &str) -> String {
    let plus_as_space = url.replace('+', " ");
    let bytes = urlencoding::decode_binary(plus_as_space.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::DownloadMode;

    const ROOT: &str = "https://example.com/Books/";

    fn item(name: &str, link: &str, is_file: bool) -> ListedItem {
        ListedItem {
            name: name.to_string(),
            link: link.to_string(),
            is_file,
            file_size: None,
            published_date: None,
        }
    }

    fn config(mode: DownloadMode, ignored_types: &[&str]) -> CrawlConfig {
        CrawlConfig::builder()
            .base_path("/srv/mirror")
            .mode(mode)
            .ignored_types(ignored_types.iter().map(ToString::to_string).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn test_blank_link_is_never_valid() {
        let cfg = config(DownloadMode::All, &[]);
        assert!(!is_valid_item(&item("Art/", "", false), ROOT, &cfg));
        assert!(!is_valid_item(&item("Art/", "   ", false), ROOT, &cfg));
        assert!(is_valid_item(&item("Art/", "Art/", false), ROOT, &cfg));
    }

    #[test]
    fn test_sentinels_are_rejected() {
        let cfg = config(DownloadMode::All, &[]);
        assert!(!is_valid_item(&item("Parent directory/", "../", false), ROOT, &cfg));
        assert!(!is_valid_item(&item(".DS_Store", ".DS_Store", true), ROOT, &cfg));
        assert!(!is_valid_item(&item("?one", "%3Fone", true), ROOT, &cfg));
    }

    #[test]
    fn test_ignored_name_wins_over_allow_list() {
        let cfg = config(DownloadMode::OnlyInclude(vec![".DS_Store".to_string()]), &[]);
        assert!(!is_valid_item(&item(".DS_Store", ".DS_Store", true), ROOT, &cfg));
    }

    #[test]
    fn test_exclude_mode_is_exact_match() {
        let cfg = config(DownloadMode::Exclude(vec!["Maps/".to_string()]), &[]);
        assert!(!is_valid_item(&item("Maps/", "Maps/", false), ROOT, &cfg));
        assert!(is_valid_item(&item("maps/", "maps/", false), ROOT, &cfg));
    }

    #[test]
    fn test_allow_list_matches_name_case_insensitively() {
        let cfg = config(DownloadMode::OnlyInclude(vec!["comics".to_string()]), &[]);
        assert!(is_valid_item(&item("Comics/", "Comics/", false), ROOT, &cfg));
        assert!(!is_valid_item(&item("Art/", "Art/", false), ROOT, &cfg));
    }

    #[test]
    fn test_allow_list_matches_decoded_url_substring() {
        let cfg = config(DownloadMode::OnlyInclude(vec!["Comic Books".to_string()]), &[]);
        let url = "https://example.com/Books/Comic%20Books/Batman/";
        assert!(is_valid_item(&item("issue1.cbz", "issue1.cbz", true), url, &cfg));
        assert!(!is_valid_item(&item("issue1.cbz", "issue1.cbz", true), ROOT, &cfg));
    }

    #[test]
    fn test_allow_list_url_match_survives_non_utf8_escape() {
        let cfg = config(DownloadMode::OnlyInclude(vec!["Comic Books".to_string()]), &[]);
        let url = "https://example.com/Books/Comic%20Books/Caf%E9/";
        assert!(is_valid_item(&item("issue1.cbz", "issue1.cbz", true), url, &cfg));
    }

    #[test]
    fn test_decode_url_is_lossy() {
        assert_eq!(
            decode_url("https://x/Comic+Books/Caf%E9/%C3%A9"),
            "https://x/Comic Books/Caf\u{fffd}/\u{e9}"
        );
    }

    #[test]
    fn test_empty_allow_list_never_excludes() {
        let cfg = config(DownloadMode::OnlyInclude(Vec::new()), &[]);
        assert!(is_valid_item(&item("anything.bin", "anything.bin", true), ROOT, &cfg));
    }

    #[test]
    fn test_ignored_type_is_raw_substring() {
        let cfg = config(DownloadMode::All, &["pdf"]);
        assert!(is_ignored_type("book.pdf", &cfg));
        assert!(is_ignored_type("pdfs-index.html", &cfg));
        assert!(!is_ignored_type("book.PDF", &cfg));
        assert!(!is_ignored_type("cover.jpg", &cfg));
    }

    #[test]
    fn test_no_ignored_types_ignores_nothing() {
        let cfg = config(DownloadMode::All, &[]);
        assert!(!is_ignored_type("book.pdf", &cfg));
    }
}
