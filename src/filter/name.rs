//! Display-name decoding.

/// Turns a listing display name into a local file name.
///
/// Names whose UTF-8 bytes were rendered as Latin-1 characters are
/// re-decoded when the bytes form valid UTF-8. Remaining `?` and U+FFFD
/// placeholders become spaces and the result is trimmed.
///
/// ```
/// use listing_mirror::filter::decode_file_name;
///
/// assert_eq!(decode_file_name("book.pdf"), "book.pdf");
/// assert_eq!(decode_file_name("Caf\u{c3}\u{a9}.pdf"), "Café.pdf");
/// assert_eq!(decode_file_name(" Why?.pdf "), "Why .pdf");
/// ```
#[must_use]
pub fn decode_file_name(name: &str) -> String {
    let recovered = recover_utf8(name);
    recovered
        .as_deref()
        .unwrap_or(name)
        .replace(['?', '\u{FFFD}'], " ")
        .trim()
        .to_string()
}

/// Reinterprets Latin-1 characters as raw bytes; `None` unless that yields
/// different, valid UTF-8.
fn recover_utf8(name: &str) -> Option<String> {
    if name.is_ascii() {
        return None;
    }
    let bytes = name
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
