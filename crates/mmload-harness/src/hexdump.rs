//! Classic 16-bytes-per-row hex dump.

const ROW: usize = 16;

/// Render `data` as rows of `OFFS: HH HH ...  ascii`. Empty input renders
/// nothing. Non-printable bytes show as `.` in the ASCII column.
#[must_use]
pub fn hex_dump(data: &[u8], prefix: &str) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(ROW).enumerate() {
        out.push_str(&format!("{prefix}{:04X}: ", row * ROW));
        for i in 0..ROW {
            match chunk.get(i) {
                Some(b) => out.push_str(&format!("{b:02X} ")),
                None => out.push_str("   "),
            }
        }
        out.push(' ');
        out.extend(chunk.iter().map(|&b| {
            if (0x20..=0x7E).contains(&b) {
                char::from(b)
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}
