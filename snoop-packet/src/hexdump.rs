//! Canonical hex dump rendering

use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;

/// Render `data` as offset, 16 hex bytes split 8+8, and a printable-ASCII gutter
///
/// Every line ends with a newline; empty input renders as an empty string.
pub fn hex_dump(data: &[u8]) -> String {
    let lines = data.len().div_ceil(BYTES_PER_LINE);
    let mut out = String::with_capacity(lines * 79);

    for (index, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        let _ = write!(out, "{:08x}  ", index * BYTES_PER_LINE);

        for column in 0..BYTES_PER_LINE {
            match chunk.get(column) {
                Some(byte) => {
                    let _ = write!(out, "{:02x} ", byte);
                }
                None => out.push_str("   "),
            }
            if column == 7 {
                out.push(' ');
            }
        }

        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }

    out
}
