use crate::wire::errors::{DecodeError, ErrorKind};
use crate::wire::varint::decode_varint;

/// Read position within an immutable in-memory model file.
///
/// The offset starts at zero and never decreases. Every consuming method
/// validates its request before moving the offset, so a call that fails
/// leaves the cursor where it was.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Return the byte at the current offset, or zero if at the end.
    pub fn peek(&self) -> u8 {
        self.buf.get(self.pos).copied().unwrap_or(0)
    }

    /// Read one byte and advance past it.
    pub fn consume_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = self.buf.get(self.pos).copied().ok_or_else(|| self.eof())?;
        self.pos += 1;
        Ok(byte)
    }

    /// Decode a varint starting at the current offset without consuming it.
    ///
    /// Returns the value and its encoded length in bytes.
    pub fn peek_varint(&self) -> Result<(u64, usize), DecodeError> {
        decode_varint(&self.buf[self.pos..]).map_err(|err| DecodeError::from_varint(err, self.pos))
    }

    /// Read a varint and advance past it.
    pub fn consume_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, len) = self.peek_varint()?;
        self.pos += len;
        Ok(value)
    }

    /// Read `len` bytes and advance past them.
    ///
    /// `len` is typically a length prefix read from the data, so it is
    /// accepted as a `u64` and may be arbitrarily large.
    pub fn consume_bytes(&mut self, len: u64) -> Result<&'a [u8], DecodeError> {
        let end = self.end_of(len).ok_or_else(|| self.eof())?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read a 4-byte little-endian value.
    pub fn consume_fixed32(&mut self) -> Result<[u8; 4], DecodeError> {
        let mut value = [0; 4];
        value.copy_from_slice(self.consume_bytes(4)?);
        Ok(value)
    }

    /// Advance to `offset`, discarding the bytes in between.
    ///
    /// Offsets at or before the current position are a no-op, as the cursor
    /// never moves backwards.
    pub fn skip_to(&mut self, offset: usize) -> Result<(), DecodeError> {
        if offset > self.pos {
            self.consume_bytes((offset - self.pos) as u64)?;
        }
        Ok(())
    }

    /// Return true if all bytes have been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Return the current offset from the start of the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Return the total length of the data.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Return the offset `len` bytes after the current one, if those bytes
    /// exist.
    fn end_of(&self, len: u64) -> Option<usize> {
        usize::try_from(len)
            .ok()
            .and_then(|len| self.pos.checked_add(len))
            .filter(|end| *end <= self.buf.len())
    }

    fn eof(&self) -> DecodeError {
        DecodeError::new(ErrorKind::UnexpectedEndOfInput, self.pos)
    }
}
