//! Output hook and the handle command handlers print through.

use core::fmt;

/// Line terminator written after every output line.
pub const LINE_BREAK: &str = "\r\n";

/// Sink for every byte the engine emits.
///
/// The engine owns its writer, so whatever context the writer carries (a
/// device handle, a buffer) travels with the engine instance.
pub trait CharWriter {
    /// Emit a single byte.
    fn write_char(&mut self, c: u8);

    /// Emit every byte of `bytes`.
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_char(b);
        }
    }

    /// Emit every byte of `s`.
    fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

impl<F: FnMut(u8)> CharWriter for F {
    #[inline]
    fn write_char(&mut self, c: u8) {
        self(c)
    }
}

/// Output handle passed to command handlers.
pub struct CliOutput<'w> {
    writer: &'w mut dyn CharWriter,
}

impl<'w> CliOutput<'w> {
    pub(crate) fn new(writer: &'w mut dyn CharWriter) -> Self {
        Self { writer }
    }

    /// Print `text` followed by a line break.
    pub fn print(&mut self, text: &str) {
        self.writer.write_str(text);
        self.writer.write_str(LINE_BREAK);
    }

    /// Emit a single raw byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.writer.write_char(byte);
    }
}

impl fmt::Write for CliOutput<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_str(s);
        Ok(())
    }
}

impl fmt::Debug for CliOutput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliOutput").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::fmt::Write;
    use std::vec::Vec;

    #[test]
    fn test_print_appends_line_break() {
        let mut out = Vec::new();
        let mut sink = |c: u8| out.push(c);
        let mut cli = CliOutput::new(&mut sink);
        cli.print("ok");
        assert_eq!(out, b"ok\r\n");
    }

    #[test]
    fn test_fmt_write() {
        let mut out = Vec::new();
        let mut sink = |c: u8| out.push(c);
        let mut cli = CliOutput::new(&mut sink);
        write!(cli, "led={}", 1).unwrap();
        cli.write_byte(b'!');
        assert_eq!(out, b"led=1!");
    }
}
