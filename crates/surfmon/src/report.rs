//! Plain-text report for the decode command

use surfmon_core::MessageRecord;

const TITLE: &str = "Windsurf Message Analysis";

/// Render the sectioned overview and hex dump of a record
pub fn render(record: &MessageRecord) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str(TITLE);
    out.push('\n');
    out.push_str(&"=".repeat(TITLE.len()));
    out.push('\n');

    for section in record.detail_sections() {
        out.push('\n');
        out.push_str(section.title);
        out.push_str(":\n");
        for (label, value) in &section.entries {
            out.push_str(&format!("  {:<19} {}\n", format!("{}:", label), value));
        }
    }

    out.push_str("\nHex Dump:\n");
    if record.hex_dump().is_empty() {
        out.push_str("  (empty)\n");
    } else {
        out.push_str(record.hex_dump());
        out.push('\n');
    }

    out
}

/// Strip a `b'...'` or `b"..."` bytes-literal wrapper from pasted input
pub fn strip_bytes_literal(input: &str) -> &str {
    let trimmed = input.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = trimmed
            .strip_prefix('b')
            .and_then(|rest| rest.strip_prefix(quote))
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use surfmon_core::{DecodedMessage, Field, FieldMap};

    #[test]
    fn test_strip_bytes_literal() {
        assert_eq!(strip_bytes_literal("b'\\xC1\\x0A'"), "\\xC1\\x0A");
        assert_eq!(strip_bytes_literal("  b\"abc\"  "), "abc");
        assert_eq!(strip_bytes_literal("'abc'"), "'abc'");
        assert_eq!(strip_bytes_literal("b'abc"), "b'abc");
        assert_eq!(strip_bytes_literal("b"), "b");
        assert_eq!(strip_bytes_literal("plain"), "plain");
    }

    #[test]
    fn test_report_sections() {
        let mut fields = FieldMap::new();
        fields.insert(Field::ClientVersion, "windsurf-2.0");
        let record = MessageRecord::new(DecodedMessage {
            bytes: vec![0xC1, 0x0A],
            hex_dump: "0000: c1 0a".to_string(),
            fields,
        });

        let report = render(&record);
        assert!(report.contains("Windsurf Message Analysis"));
        assert!(report.contains("Client Data:"));
        assert!(report.contains("  Client Version:     windsurf-2.0"));
        assert!(report.contains("  Session ID:         Unknown"));
        assert!(report.contains("  API Status:         Not sent ✗"));
        assert!(report.contains("  Magic Header:       Present"));
        assert!(report.contains("Hex Dump:\n0000: c1 0a"));
    }

    #[test]
    fn test_report_for_empty_message() {
        let record = MessageRecord::new(DecodedMessage::default());
        let report = render(&record);
        assert!(report.contains("  Size:               0 bytes"));
        assert!(report.contains("Hex Dump:\n  (empty)"));
    }
}
