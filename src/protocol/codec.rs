//! Line framing for byte streams
//!
//! Serial links deliver an unframed byte stream. Commands are split on CR or
//! LF, and each complete line is handed out in arrival order.

use bytes::{Buf, BytesMut};

/// Longest line kept before the buffer is discarded as garbage
const MAX_LINE_LEN: usize = 4096;

/// Splits an incoming byte stream into command lines
pub struct LineDecoder {
    buf: BytesMut,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Append received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);

        if self.buf.len() > MAX_LINE_LEN && !self.buf.iter().any(|b| is_terminator(*b)) {
            tracing::warn!(
                "Discarding {} unterminated bytes from line buffer",
                self.buf.len()
            );
            self.buf.clear();
        }
    }

    /// Take the next complete line.
    ///
    /// Returns the line text and how many bytes remain buffered after it, or
    /// `None` once no complete line is left. Empty lines (the second half of
    /// a CRLF pair, blank input) are skipped.
    pub fn read_line(&mut self) -> Option<(String, usize)> {
        loop {
            let end = self.buf.iter().position(|b| is_terminator(*b))?;
            let line = self.buf.split_to(end);
            self.buf.advance(1);

            if line.is_empty() {
                continue;
            }

            let text = String::from_utf8_lossy(&line).into_owned();
            return Some((text, self.buf.len()));
        }
    }

    /// Bytes waiting for a terminator
    #[cfg(test)]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn is_terminator(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}
