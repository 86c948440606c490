//! Growable line reader.
//!
//! Wraps any [`Read`] and yields one terminator-stripped line per call into a
//! buffer that grows to fit arbitrarily long lines and is reused across
//! calls. Forward-only; a call interrupted by an error is not resumable
//! mid-line, but the next call starts a fresh line.

use std::io::{self, BufRead, BufReader, Read};

/// Reads one line at a time into a reusable, growable byte buffer.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// The next line with its terminator (`\n` or `\r\n`) stripped.
    ///
    /// Returns `Ok(Some(line))` when a line was read, `Ok(None)` at end of
    /// stream, and `Err` on a read failure. A final line without a
    /// terminator is still a line; the call after it reports end of stream.
    ///
    /// The returned slice borrows the internal buffer and is valid until the
    /// next call.
    pub fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        self.buf.clear();
        let n = self.inner.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(&self.buf))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
