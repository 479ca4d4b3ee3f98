//! Sliding-window cursor over an accumulating byte stream.
//!
//! Streaming decoders see input in arbitrary fragments. [`ByteCursor`] wraps
//! the accumulation buffer with an explicit reader index so a decoder can
//! peek as far ahead as it likes, and only commit consumption once it knows a
//! complete frame is present (the checkpoint pattern). Rewinding the reader
//! index back to a checkpoint makes "need more data" a cheap, non-destructive
//! outcome.
//!
//! Reads that would run past the readable region return `None` — never a
//! partial result.

use bytes::{Buf, Bytes, BytesMut};

/// A non-owning view over an accumulating byte buffer with an explicit
/// reader index.
///
/// Bytes before the reader index count as consumed; they are trimmed from the
/// underlying buffer when the cursor is dropped (or eagerly by
/// [`read_slice`](ByteCursor::read_slice)).
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use gangway_proto::cursor::ByteCursor;
///
/// let mut buf = BytesMut::from(&b"\x00\x2a"[..]);
/// let mut cursor = ByteCursor::new(&mut buf);
/// assert_eq!(cursor.peek_u16_be(0), Some(42));
/// assert_eq!(cursor.read_u16_be(), Some(42));
/// assert_eq!(cursor.readable(), 0);
/// ```
#[derive(Debug)]
pub struct ByteCursor<'a> {
    buf: &'a mut BytesMut,
    reader: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a mut BytesMut) -> ByteCursor<'a> {
        ByteCursor { buf, reader: 0 }
    }

    /// Number of bytes readable past the reader index.
    #[inline]
    pub fn readable(&self) -> usize {
        self.buf.len() - self.reader
    }

    /// Current reader index.
    #[inline]
    pub fn reader_index(&self) -> usize {
        self.reader
    }

    /// Index one past the last written byte (the end of the readable region).
    #[inline]
    pub fn writer_index(&self) -> usize {
        self.buf.len()
    }

    /// Rewind or advance the reader index to an absolute position.
    ///
    /// Rewinding across a previous [`read_slice`](ByteCursor::read_slice) is
    /// a contract violation: sliced bytes are already detached from the
    /// buffer.
    ///
    /// # Panics
    ///
    /// Panics if `index` is beyond the written region.
    pub fn set_reader_index(&mut self, index: usize) {
        assert!(index <= self.buf.len(), "reader index out of bounds");
        self.reader = index;
    }

    /// Peek the byte at `offset` past the reader index without consuming.
    #[inline]
    pub fn peek(&self, offset: usize) -> Option<u8> {
        self.buf.get(self.reader + offset).copied()
    }

    /// Peek a big-endian u16 at `offset` past the reader index.
    #[inline]
    pub fn peek_u16_be(&self, offset: usize) -> Option<u16> {
        let hi = self.peek(offset)?;
        let lo = self.peek(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// Peek `len` bytes starting at `offset` past the reader index.
    pub fn peek_slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let start = self.reader + offset;
        self.buf.get(start..start + len)
    }

    /// Read and consume one byte.
    pub fn read_u8(&mut self) -> Option<u8> {
        let b = self.peek(0)?;
        self.reader += 1;
        Some(b)
    }

    /// Read and consume a big-endian u16.
    pub fn read_u16_be(&mut self) -> Option<u16> {
        let v = self.peek_u16_be(0)?;
        self.reader += 2;
        Some(v)
    }

    /// Detach the next `n` bytes as a reference-counted [`Bytes`] view.
    ///
    /// This is zero-copy: the returned view shares storage with the buffer.
    /// All bytes before the reader index are committed (trimmed) as a side
    /// effect, so the reader index must not be rewound past this point
    /// afterwards.
    pub fn read_slice(&mut self, n: usize) -> Option<Bytes> {
        if self.readable() < n {
            return None;
        }
        self.buf.advance(self.reader);
        self.reader = 0;
        Some(self.buf.split_to(n).freeze())
    }

    /// Skip up to `n` bytes, returning how many were actually skipped.
    ///
    /// Skipping fewer than `n` bytes means the buffer ran dry — useful for
    /// discard-mode accounting.
    pub fn skip(&mut self, n: usize) -> usize {
        let skipped = n.min(self.readable());
        self.reader += skipped;
        skipped
    }

    /// Find the first byte matching `pred` within `[start, start + len)`
    /// past the reader index.
    ///
    /// Returns the offset from the reader index. The search window is
    /// clipped to the readable region.
    pub fn find_byte<P>(&self, start: usize, len: usize, pred: P) -> Option<usize>
    where
        P: Fn(u8) -> bool,
    {
        let from = self.reader + start;
        let to = (from.checked_add(len)?).min(self.buf.len());
        self.buf
            .get(from..to)?
            .iter()
            .position(|&b| pred(b))
            .map(|i| start + i)
    }
}

impl Drop for ByteCursor<'_> {
    fn drop(&mut self) {
        // Commit consumption: everything before the reader index is gone.
        self.buf.advance(self.reader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_does_not_consume() {
        let mut buf = BytesMut::from(&b"abc"[..]);
        let cursor = ByteCursor::new(&mut buf);
        assert_eq!(cursor.peek(0), Some(b'a'));
        assert_eq!(cursor.peek(2), Some(b'c'));
        assert_eq!(cursor.peek(3), None);
        assert_eq!(cursor.readable(), 3);
        assert_eq!(cursor.writer_index(), 3);
    }

    #[test]
    fn test_read_past_end_returns_none() {
        let mut buf = BytesMut::from(&b"x"[..]);
        let mut cursor = ByteCursor::new(&mut buf);
        assert_eq!(cursor.read_u16_be(), None);
        assert_eq!(cursor.read_u8(), Some(b'x'));
        assert_eq!(cursor.read_u8(), None);
    }

    #[test]
    fn test_drop_commits_consumption() {
        let mut buf = BytesMut::from(&b"hello"[..]);
        {
            let mut cursor = ByteCursor::new(&mut buf);
            cursor.read_u8();
            cursor.read_u8();
        }
        assert_eq!(&buf[..], b"llo");
    }

    #[test]
    fn test_rewind_makes_need_more_data_cheap() {
        let mut buf = BytesMut::from(&b"partial"[..]);
        {
            let mut cursor = ByteCursor::new(&mut buf);
            let checkpoint = cursor.reader_index();
            cursor.skip(4);
            // Frame turned out incomplete: rewind and bail.
            cursor.set_reader_index(checkpoint);
        }
        assert_eq!(&buf[..], b"partial");
    }

    #[test]
    fn test_read_slice_is_shared_view() {
        let mut buf = BytesMut::from(&b"0123456789"[..]);
        let mut cursor = ByteCursor::new(&mut buf);
        cursor.skip(2);
        let slice = cursor.read_slice(3).unwrap();
        assert_eq!(&slice[..], b"234");
        assert_eq!(cursor.readable(), 5);
        // The view survives further consumption of the buffer.
        drop(cursor);
        assert_eq!(&buf[..], b"56789");
        assert_eq!(&slice[..], b"234");
    }

    #[test]
    fn test_read_slice_short_buffer() {
        let mut buf = BytesMut::from(&b"ab"[..]);
        let mut cursor = ByteCursor::new(&mut buf);
        assert_eq!(cursor.read_slice(3), None);
        assert_eq!(cursor.readable(), 2);
    }

    #[test]
    fn test_find_byte_window() {
        let mut buf = BytesMut::from(&b"abc\r\ndef"[..]);
        let cursor = ByteCursor::new(&mut buf);
        assert_eq!(cursor.find_byte(0, 8, |b| b == b'\n'), Some(4));
        assert_eq!(cursor.find_byte(0, 3, |b| b == b'\n'), None);
        assert_eq!(cursor.find_byte(5, 100, |b| b == b'\n'), None);
    }

    #[test]
    fn test_skip_saturates() {
        let mut buf = BytesMut::from(&b"abc"[..]);
        let mut cursor = ByteCursor::new(&mut buf);
        assert_eq!(cursor.skip(10), 3);
        assert_eq!(cursor.readable(), 0);
    }
}
