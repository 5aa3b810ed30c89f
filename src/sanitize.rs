//! Conversion of string fields to Rust strings.

/// Return true for bytes which may appear in a sanitized name.
fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-' | b'/')
}

/// Extract a name from the bytes of a string field.
///
/// The result is the longest prefix of `bytes` consisting only of ASCII
/// letters, digits, `_`, `.`, `-` and `/`. Everything from the first other
/// byte onwards is dropped, so `"abc:def"` becomes `"abc"` rather than
/// `"abcdef"`.
pub fn clean_string(bytes: &[u8]) -> String {
    let len = bytes
        .iter()
        .position(|byte| !is_name_byte(*byte))
        .unwrap_or(bytes.len());

    // The prefix is pure ASCII.
    bytes[..len].iter().map(|byte| *byte as char).collect()
}

/// Convert the bytes of a metadata string field to text, replacing invalid
/// UTF-8 sequences.
pub fn lossy_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
