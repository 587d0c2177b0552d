//! Heuristic field extraction
//!
//! Messages carry no schema, only a handful of delimiters that reliably
//! surround the interesting values. Each [`Rule`] looks for one of those
//! delimiters and contributes zero or more fields. Rules never look at each
//! other's output, so they can fire in any combination.

use crate::normalize::latin1_string;
use std::panic::{self, AssertUnwindSafe};
use surfmon_core::{Field, FieldMap, MAGIC_HEADER};
use tracing::trace;

/// Marker identifying the client, matched ignoring ASCII case
const CLIENT_MARKER: &str = "windsurf";

/// Separates the client version from the session id
const SESSION_DELIMITER: &str = "$";

/// Terminates the session id
const SESSION_TERMINATOR: char = '"';

/// Precedes the protocol version
const VERSION_MARKER: &str = "en:";

/// Precedes the machine id
const MACHINE_MARKER: &str = "R$";

/// Precedes the tail of the installation path
const INSTALL_MARKER: &str = "Program Files";

/// Prefix re-attached to the installation path tail
const INSTALL_PREFIX: &str = r"C:\Program Files";

/// Language reported whenever a protocol version is present
pub const DEFAULT_LANGUAGE: &str = "ru";

/// Extraction switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Report [`DEFAULT_LANGUAGE`] even when no version marker is present.
    ///
    /// Older consumers relied on `language` always being set.
    pub legacy_language_default: bool,
}

/// One extraction heuristic
struct Rule {
    name: &'static str,
    apply: fn(&str, &ExtractOptions) -> Vec<(Field, String)>,
}

const RULES: &[Rule] = &[
    Rule {
        name: "client",
        apply: client_rule,
    },
    Rule {
        name: "version",
        apply: version_rule,
    },
    Rule {
        name: "machine",
        apply: machine_rule,
    },
    Rule {
        name: "install_path",
        apply: install_path_rule,
    },
];

/// Applies every rule to message text
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    options: ExtractOptions,
}

impl FieldExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Decode canonical bytes to text and extract fields from it
    pub fn extract_bytes(&self, bytes: &[u8]) -> FieldMap {
        self.extract(&decode_text(bytes))
    }

    /// Extract fields from text.
    ///
    /// Never fails. If a rule panics the returned map carries only the
    /// panic description as its error.
    pub fn extract(&self, text: &str) -> FieldMap {
        let options = self.options;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut fields = FieldMap::new();
            for rule in RULES {
                let found = (rule.apply)(text, &options);
                trace!(rule = rule.name, found = found.len(), "Applied extraction rule");
                for (field, value) in found {
                    fields.insert(field, value);
                }
            }
            fields
        }));

        result.unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "field extraction panicked".to_string());
            FieldMap::failed(message)
        })
    }
}

/// Text view of canonical bytes.
///
/// The magic header is skipped and invalid UTF-8 sequences are dropped. If
/// nothing valid remains of a non-empty input, every byte is taken as a
/// single-byte character instead.
pub fn decode_text(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(&MAGIC_HEADER[..]).unwrap_or(bytes);

    let text: String = body.utf8_chunks().map(|chunk| chunk.valid()).collect();
    if text.is_empty() && !body.is_empty() {
        return latin1_string(body);
    }
    text
}

/// Text between the first `marker` and the next one (or the end)
fn segment_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = text.split_once(marker)?;
    Some(rest.split(marker).next().unwrap_or(rest))
}

/// Byte position of `needle` in `haystack`, ignoring ASCII case
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn client_rule(text: &str, _: &ExtractOptions) -> Vec<(Field, String)> {
    if find_ignore_ascii_case(text, CLIENT_MARKER).is_none() {
        return Vec::new();
    }

    let client_version = text.split(SESSION_DELIMITER).next().unwrap_or(text);
    let mut found = vec![(Field::ClientVersion, client_version.trim().to_string())];

    if let Some(session) = segment_after(text, SESSION_DELIMITER)
        .and_then(|seg| seg.split_once(SESSION_TERMINATOR))
        .map(|(session, _)| session)
    {
        found.push((Field::SessionId, session.trim().to_string()));
    }

    found
}

fn version_rule(text: &str, options: &ExtractOptions) -> Vec<(Field, String)> {
    match segment_after(text, VERSION_MARKER) {
        Some(segment) => match segment.split_once(' ') {
            Some((version, _)) => vec![
                (Field::Version, version.trim().to_string()),
                (Field::Language, DEFAULT_LANGUAGE.to_string()),
            ],
            None => Vec::new(),
        },
        None if options.legacy_language_default => {
            vec![(Field::Language, DEFAULT_LANGUAGE.to_string())]
        }
        None => Vec::new(),
    }
}

fn machine_rule(text: &str, _: &ExtractOptions) -> Vec<(Field, String)> {
    segment_after(text, MACHINE_MARKER)
        .and_then(|segment| {
            find_ignore_ascii_case(segment, CLIENT_MARKER).map(|end| &segment[..end])
        })
        .map(|machine_id| vec![(Field::MachineId, machine_id.trim().to_string())])
        .unwrap_or_default()
}

fn install_path_rule(text: &str, _: &ExtractOptions) -> Vec<(Field, String)> {
    segment_after(text, INSTALL_MARKER)
        .map(|tail| {
            let tail = tail.split('\0').next().unwrap_or(tail);
            vec![(Field::InstallationPath, format!("{INSTALL_PREFIX}{tail}"))]
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> FieldMap {
        FieldExtractor::default().extract(text)
    }

    #[test]
    fn test_client_version_and_session() {
        let fields = extract("windsurf-1.2$abc123\"def:more");
        assert_eq!(fields.get(Field::ClientVersion), Some("windsurf-1.2"));
        assert_eq!(fields.get(Field::SessionId), Some("abc123"));
    }

    #[test]
    fn test_client_marker_is_case_insensitive() {
        let fields = extract("  WindSurf 3 $ s1 \"");
        assert_eq!(fields.get(Field::ClientVersion), Some("WindSurf 3"));
        assert_eq!(fields.get(Field::SessionId), Some("s1"));
    }

    #[test]
    fn test_session_needs_terminator_within_segment() {
        assert!(!extract("windsurf$abc").contains(Field::SessionId));
        // The quote sits after the second '$', outside the session segment.
        assert!(!extract("windsurf$abc$def\"").contains(Field::SessionId));
        assert_eq!(extract("windsurf$abc").get(Field::ClientVersion), Some("windsurf"));
    }

    #[test]
    fn test_no_client_marker_no_client_fields() {
        let fields = extract("other-1.0$abc\"");
        assert!(!fields.contains(Field::ClientVersion));
        assert!(!fields.contains(Field::SessionId));
    }

    #[test]
    fn test_version_sets_language() {
        let fields = extract("en:9.8 extra");
        assert_eq!(fields.get(Field::Version), Some("9.8"));
        assert_eq!(fields.get(Field::Language), Some(DEFAULT_LANGUAGE));
    }

    #[test]
    fn test_version_needs_trailing_space() {
        let fields = extract("en:9.8");
        assert!(!fields.contains(Field::Version));
        assert!(!fields.contains(Field::Language));
    }

    #[test]
    fn test_legacy_language_default() {
        let legacy = FieldExtractor::new(ExtractOptions {
            legacy_language_default: true,
        });
        assert_eq!(legacy.extract("nothing here").get(Field::Language), Some("ru"));
        assert!(!extract("nothing here").contains(Field::Language));
    }

    #[test]
    fn test_machine_id() {
        let fields = extract("xR$machine42windsurf");
        assert_eq!(fields.get(Field::MachineId), Some("machine42"));

        let fields = extract("R$ m-7 WINDSURF");
        assert_eq!(fields.get(Field::MachineId), Some("m-7"));

        assert!(!extract("R$machine42").contains(Field::MachineId));
    }

    #[test]
    fn test_installation_path() {
        let fields = extract("at Program Files\\WindsurfApp\0garbage");
        assert_eq!(
            fields.get(Field::InstallationPath),
            Some(r"C:\Program Files\WindsurfApp")
        );
    }

    #[test]
    fn test_installation_path_stops_at_next_marker() {
        let fields = extract("Program Files\\a Program Files\\b");
        assert_eq!(fields.get(Field::InstallationPath), Some(r"C:\Program Files\a "));
    }

    #[test]
    fn test_rules_fire_together() {
        let bytes = b"\xC1\x0Awindsurf-2.0$sess9\"en:5.5 Program Files\\WindsurfApp\x00";
        let fields = FieldExtractor::default().extract_bytes(bytes);

        assert_eq!(fields.get(Field::ClientVersion), Some("windsurf-2.0"));
        assert_eq!(fields.get(Field::SessionId), Some("sess9"));
        assert_eq!(fields.get(Field::Version), Some("5.5"));
        assert_eq!(fields.get(Field::Language), Some("ru"));
        assert_eq!(
            fields.get(Field::InstallationPath),
            Some(r"C:\Program Files\WindsurfApp")
        );
        assert!(!fields.contains(Field::MachineId));
        assert!(fields.error().is_none());
    }

    #[test]
    fn test_empty_input_has_no_fields() {
        let fields = FieldExtractor::default().extract_bytes(&[]);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"\xC1\x0Aabc"), "abc");
        assert_eq!(decode_text(b"a\xffb"), "ab");
        assert_eq!(decode_text(&[0xC1, 0x0A]), "");
        assert_eq!(decode_text(&[0xff, 0xe9]), "\u{ff}\u{e9}");
    }

    #[test]
    fn test_segment_after() {
        assert_eq!(segment_after("a$b$c", "$"), Some("b"));
        assert_eq!(segment_after("a$b", "$"), Some("b"));
        assert_eq!(segment_after("a$", "$"), Some(""));
        assert_eq!(segment_after("ab", "$"), None);
    }
}
