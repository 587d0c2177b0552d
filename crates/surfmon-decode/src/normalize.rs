//! Byte normalization
//!
//! Messages reach surfmon either as bytes (files, watcher events) or as text
//! typed on the command line. Text may be quoted, may spell bytes as `\xNN`
//! escapes mixed with literal characters, or may be plain 8-bit text. All of
//! these map onto one canonical byte sequence here.

use surfmon_core::RawMessage;

/// Two-character marker introducing a hex escape
const ESCAPE_MARKER: &str = "\\x";

/// Canonical bytes for any raw input. Bytes pass through unchanged.
pub fn normalize(raw: RawMessage) -> Vec<u8> {
    match raw {
        RawMessage::Bytes(bytes) => bytes,
        RawMessage::Text(text) => normalize_text(&text),
    }
}

/// Canonical bytes for a textual encoding
pub fn normalize_text(text: &str) -> Vec<u8> {
    let trimmed = strip_quotes(text.trim()).trim();

    if trimmed.contains(ESCAPE_MARKER) {
        decode_escaped(trimmed)
    } else {
        latin1_bytes(trimmed)
    }
}

/// Remove one layer of matching `'` or `"` quotes
fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Decode mixed `\xNN` / literal text.
///
/// Each non-empty part between markers contributes one byte from its first
/// two hex digits followed by its remaining characters as raw bytes. A part
/// that does not start with two hex digits is kept whole as raw bytes.
fn decode_escaped(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());

    for part in text.split(ESCAPE_MARKER).filter(|p| !p.is_empty()) {
        match split_hex_prefix(part) {
            Some((byte, rest)) => {
                out.push(byte);
                out.extend(latin1_bytes(rest));
            }
            None => out.extend(latin1_bytes(part)),
        }
    }

    out
}

fn split_hex_prefix(part: &str) -> Option<(u8, &str)> {
    let digits = part.get(..2)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = u8::from_str_radix(digits, 16).ok()?;
    Some((byte, &part[2..]))
}

/// Single-byte encoding of text.
///
/// Code points up to U+00FF become one byte each (Latin-1). Anything above
/// has no single-byte form and is kept as its UTF-8 bytes.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(byte) => out.push(byte),
            Err(_) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out
}

/// Inverse of [`latin1_bytes`] for bytes that are not valid UTF-8
pub fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_pass_through() {
        let bytes = vec![0x00, 0xC1, 0x0A, b'\\', b'x', b'4', b'1'];
        assert_eq!(normalize(RawMessage::Bytes(bytes.clone())), bytes);
    }

    #[test]
    fn test_normalize_is_idempotent_on_bytes() {
        let once = normalize(RawMessage::Text("\\xC1\\x0Aabc".into()));
        let twice = normalize(RawMessage::Bytes(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_plain_text_is_latin1() {
        assert_eq!(normalize_text("  hello  "), b"hello");
        assert_eq!(normalize_text("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(normalize_text(""), Vec::<u8>::new());
    }

    #[test]
    fn test_strips_one_layer_of_matching_quotes() {
        assert_eq!(normalize_text("'abc'"), b"abc");
        assert_eq!(normalize_text("\"abc\""), b"abc");
        assert_eq!(normalize_text("\"'abc'\""), b"'abc'");
        assert_eq!(normalize_text("'abc\""), b"'abc\"");
        assert_eq!(normalize_text(" ' abc ' "), b"abc");
        assert_eq!(normalize_text("'"), b"'");
    }

    #[test]
    fn test_hex_escapes() {
        assert_eq!(normalize_text("\\xC1\\x0A"), vec![0xC1, 0x0A]);
        assert_eq!(
            normalize_text("\\xC1\\x0Awindsurf"),
            [&[0xC1, 0x0A][..], b"windsurf"].concat()
        );
    }

    #[test]
    fn test_leading_literal_part_is_treated_like_any_part() {
        // "ab" parses as a hex byte even before the first marker.
        assert_eq!(normalize_text("abc\\x41"), vec![0xAB, b'c', 0x41]);
        assert_eq!(normalize_text("zz\\x41"), vec![b'z', b'z', 0x41]);
    }

    #[test]
    fn test_bad_hex_falls_back_to_raw_part() {
        assert_eq!(normalize_text("\\xZZtop"), b"ZZtop");
        assert_eq!(normalize_text("\\x+1"), b"+1");
        assert_eq!(normalize_text("\\x4"), b"4");
        assert_eq!(normalize_text("\\x\\x41"), vec![0x41]);
    }

    #[test]
    fn test_wide_characters_never_fail() {
        assert_eq!(normalize_text("\u{20ac}"), "\u{20ac}".as_bytes());
        assert_eq!(normalize_text("\\x\u{20ac}1"), [&"\u{20ac}".as_bytes()[..], b"1"].concat());
    }

    #[test]
    fn test_latin1_string_round_trip() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(latin1_bytes(&latin1_string(&bytes)), bytes);
    }
}
