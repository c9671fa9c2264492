//! Local path construction.
//!
//! Both `/` and `\` split segments, whichever host we run on, and every
//! segment is trimmed on its own. Output uses the native separator.

use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Appends `segment` to `dir`, splitting and trimming each part.
///
/// Blank parts and `.`/`..` are dropped so a listing name cannot climb out
/// of `dir`.
#[must_use]
pub fn join_segment(dir: &Path, segment: &str) -> PathBuf {
    let mut joined = dir.to_path_buf();
    for part in clean_parts(segment) {
        joined.push(part);
    }
    joined
}

/// Rebuilds `path` with every segment trimmed.
///
/// ```
/// use std::path::Path;
/// use listing_mirror::filter::normalize_path;
///
/// assert_eq!(normalize_path(Path::new(" /srv/ my mirror /books ")), Path::new("/srv/my mirror/books"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let raw = raw.trim();

    let mut normalized = PathBuf::new();
    if raw.starts_with(SEPARATORS) {
        normalized.push(MAIN_SEPARATOR_STR);
    }

    let mut parts = raw
        .split(SEPARATORS)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .peekable();

    // A drive prefix needs its separator, otherwise `C:` + `out` is drive-relative.
    if let Some(drive) = parts.next_if(|part| is_drive_prefix(part)) {
        normalized.push(format!("{drive}{MAIN_SEPARATOR_STR}"));
    }
    for part in parts {
        normalized.push(part);
    }
    normalized
}

fn clean_parts(segment: &str) -> impl Iterator<Item = &str> {
    segment
        .split(SEPARATORS)
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
}

fn is_drive_prefix(part: &str) -> bool {
    let bytes = part.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
