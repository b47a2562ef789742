// SPDX-License-Identifier: MIT
//
// OutputBuffer: one frame's worth of bytes, written in one go.
//
// Every fragment of a render instruction is encoded into this buffer first;
// the renderer then hands the whole frame to the output stream with a single
// `write_all`. A frame never reaches the terminal half-written because of
// our own buffering, and the per-escape syscall cost disappears.

use std::io::{self, Write};

const DEFAULT_CAPACITY: usize = 16_384;

/// Accumulates encoded output for a single write.
///
/// The allocation is kept across frames; [`clear`](Self::clear) and
/// [`flush_to`](Self::flush_to) only reset the length.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    /// An empty buffer with 16 KB reserved.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop the contents, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to `w` in one `write_all`, flush it, then clear.
    ///
    /// On failure the contents are kept so the caller can inspect them; the
    /// renderer discards them anyway and repaints in full.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // No-op: real flushing happens in flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A writer that counts `write` calls.
    #[derive(Default)]
    struct CountingWriter {
        data: Vec<u8>,
        writes: usize,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn starts_empty() {
        let buf = OutputBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn write_trait_appends() {
        let mut buf = OutputBuffer::new();
        write!(buf, "\x1b[{};{}H", 3, 5).unwrap();
        write!(buf, "日本").unwrap();
        assert_eq!(buf.buf, "\x1b[3;5H日本".as_bytes());
        assert_eq!(buf.len(), 12);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = OutputBuffer::new();
        write!(buf, "some data").unwrap();
        let cap = buf.buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.buf.capacity(), cap);
    }

    #[test]
    fn flush_to_is_a_single_write() {
        let mut buf = OutputBuffer::new();
        for i in 0..100 {
            write!(buf, "\x1b[{i}mX").unwrap();
        }
        let mut dest = CountingWriter::default();
        buf.flush_to(&mut dest).unwrap();
        assert_eq!(dest.writes, 1);
        assert!(dest.data.starts_with(b"\x1b[0mX"));
        assert!(buf.is_empty());
    }

    #[test]
    fn flush_to_empty_is_noop() {
        let mut buf = OutputBuffer::new();
        let mut dest = CountingWriter::default();
        buf.flush_to(&mut dest).unwrap();
        assert_eq!(dest.writes, 0);
    }
}
