//! Hex dump formatting
//!
//! Renders byte streams as the classic 16-column offset / hex / ASCII view:
//!
//! ```text
//! 0x0000: 48 65 6C 6C 6F 00 FF 41 42 43 44 45 46 47 48 49  | Hello..ABCDEFGHI
//! ```
//!
//! Offsets are `base + line * 16`, at least four upper-case hex digits.
//! Missing columns on the last line are padded with three spaces each so the
//! ASCII column always lines up.

use core::fmt;

/// Bytes per output line
pub const BYTES_PER_LINE: usize = 16;

/// Streaming hex dump writer
///
/// Bytes can be pushed in arbitrarily sized chunks; line boundaries are
/// derived from the total number of bytes seen, not from chunk boundaries.
pub struct HexDumpWriter<W: fmt::Write> {
    out: W,
    base: u32,
    line: [u8; BYTES_PER_LINE],
    fill: usize,
    lines: u32,
}

impl<W: fmt::Write> HexDumpWriter<W> {
    /// Create a writer whose first line is labelled `base`
    pub fn new(out: W, base: u32) -> Self {
        Self {
            out,
            base,
            line: [0; BYTES_PER_LINE],
            fill: 0,
            lines: 0,
        }
    }

    /// Append bytes, emitting every line that becomes complete
    pub fn push(&mut self, bytes: &[u8]) -> fmt::Result {
        for &b in bytes {
            self.line[self.fill] = b;
            self.fill += 1;
            if self.fill == BYTES_PER_LINE {
                self.flush_line()?;
            }
        }
        Ok(())
    }

    /// Emit the trailing partial line (if any) and return the sink
    pub fn finish(mut self) -> Result<W, fmt::Error> {
        if self.fill > 0 {
            self.flush_line()?;
        }
        Ok(self.out)
    }

    fn flush_line(&mut self) -> fmt::Result {
        let offset = self
            .base
            .wrapping_add(self.lines.wrapping_mul(BYTES_PER_LINE as u32));
        write_line(&mut self.out, offset, &self.line[..self.fill])?;
        self.lines += 1;
        self.fill = 0;
        Ok(())
    }
}

fn write_line<W: fmt::Write + ?Sized>(out: &mut W, offset: u32, bytes: &[u8]) -> fmt::Result {
    write!(out, "0x{:04X}: ", offset)?;
    for col in 0..BYTES_PER_LINE {
        match bytes.get(col) {
            Some(b) => write!(out, "{:02X} ", b)?,
            None => out.write_str("   ")?,
        }
    }
    out.write_str(" | ")?;
    for &b in bytes {
        let c = if (0x20..=0x7E).contains(&b) { b as char } else { '.' };
        out.write_char(c)?;
    }
    out.write_char('\n')
}

/// Display adapter rendering a byte slice as a hex dump
///
/// An empty slice renders as nothing.
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a> {
    bytes: &'a [u8],
    base: u32,
}

impl<'a> HexDump<'a> {
    /// Dump `bytes` with the first line labelled `base`
    pub fn new(bytes: &'a [u8], base: u32) -> Self {
        Self { bytes, base }
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = HexDumpWriter::new(f, self.base);
        writer.push(self.bytes)?;
        writer.finish().map(|_| ())
    }
}

/// Format `bytes` as a hex dump into a new string
#[cfg(feature = "alloc")]
pub fn format_hex_dump(bytes: &[u8], base: u32) -> alloc::string::String {
    use alloc::string::ToString;
    HexDump::new(bytes, base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;
    use std::string::String;

    #[test]
    fn test_empty_input_renders_nothing() {
        assert_eq!(format!("{}", HexDump::new(&[], 0x1234)), "");
    }

    #[test]
    fn test_full_line_has_no_padding() {
        let bytes: [u8; 16] = *b"0123456789ABCDEF";
        let out = format!("{}", HexDump::new(&bytes, 0));

        assert_eq!(
            out,
            "0x0000: 30 31 32 33 34 35 36 37 38 39 41 42 43 44 45 46  | 0123456789ABCDEF\n"
        );
    }

    #[test]
    fn test_partial_line_is_padded() {
        let out = format!("{}", HexDump::new(&[0x41, 0x00, 0x7F], 0x10));
        let expected = String::from("0x0010: 41 00 7F ") + &"   ".repeat(13) + " | A..\n";

        assert_eq!(out, expected);
    }

    #[test]
    fn test_line_count_and_offsets() {
        let bytes = [0xAAu8; 40];
        let out = format!("{}", HexDump::new(&bytes, 0x100));
        let lines: std::vec::Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("0x0100: "));
        assert!(lines[1].starts_with("0x0110: "));
        assert!(lines[2].starts_with("0x0120: "));
        // every line keeps the ASCII separator in the same column
        for line in &lines {
            assert_eq!(line.find(" | "), Some(8 + 16 * 3));
        }
    }

    #[test]
    fn test_wide_offsets_are_not_truncated() {
        let out = format!("{}", HexDump::new(&[0x20], 0x12_3450));
        assert!(out.starts_with("0x123450: 20 "));
        assert!(out.ends_with(" |  \n"));
    }

    #[test]
    fn test_streaming_alignment_is_global() {
        let bytes: std::vec::Vec<u8> = (0u8..40).collect();

        let mut writer = HexDumpWriter::new(String::new(), 0);
        writer.push(&bytes[..5]).unwrap();
        writer.push(&bytes[5..23]).unwrap();
        writer.push(&bytes[23..]).unwrap();
        let streamed = writer.finish().unwrap();

        assert_eq!(streamed, format!("{}", HexDump::new(&bytes, 0)));
    }
}
