//! Offset/hex/ASCII rendering of byte sequences

/// Bytes shown per line
const BYTES_PER_LINE: usize = 16;

/// Width of the hex column, padded so the ASCII column lines up
const HEX_COLUMN_WIDTH: usize = BYTES_PER_LINE * 3;

/// Render `data` as hex dump lines.
///
/// Each line is `OOOO: <hex bytes> <ascii>` where the offset is four lowercase
/// hex digits counted from `offset`, hex bytes are space separated and padded
/// to a fixed width, and non-printable bytes show as `.` in the ASCII column.
/// Empty input renders as an empty string.
pub fn hex_dump(data: &[u8], offset: usize) -> String {
    data.chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| {
            let hex = chunk
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ");
            let ascii: String = chunk.iter().map(|&b| printable(b)).collect();
            format!(
                "{:04x}: {:<width$} {}",
                offset + i * BYTES_PER_LINE,
                hex,
                ascii,
                width = HEX_COLUMN_WIDTH
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn printable(byte: u8) -> char {
    if (32..=126).contains(&byte) {
        char::from(byte)
    } else {
        '.'
    }
}
