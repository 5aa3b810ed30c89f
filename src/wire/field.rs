use crate::wire::cursor::ByteCursor;
use crate::wire::errors::{DecodeError, ErrorKind};

/// Encoding of a field's value.
///
/// See <https://protobuf.dev/programming-guides/encoding/#structure>.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WireType {
    /// Integer value encoded as a varint.
    Varint,
    /// 64-bit fixed-width value.
    Fixed64,
    /// A variable-length value with a size specified in bytes.
    Len,
    /// 32-bit fixed-width value.
    Fixed32,
}

impl WireType {
    /// Return the wire type for the low 3 bits of a field key.
    ///
    /// Returns `None` for the deprecated group types and the two unassigned
    /// values.
    pub fn from_bits(bits: u8) -> Option<WireType> {
        match bits {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::Len),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// Field number and wire type from the key that precedes each field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tag {
    pub field: u64,

    /// Raw wire type bits. See [`WireType::from_bits`].
    pub wire_type: u8,
}

impl Tag {
    /// Return true if this tag is `field` with wire type `wire_type`.
    pub fn is(&self, field: u64, wire_type: WireType) -> bool {
        self.field == field && WireType::from_bits(self.wire_type) == Some(wire_type)
    }
}

/// Split a field key into its field number and wire type.
///
/// Keys for field numbers 1 to 15 fit in a single byte, in which case this is
/// the byte shifted right by 3 and masked with 0x7 respectively.
pub fn decode_tag(key: u64) -> Tag {
    Tag {
        field: key >> 3,
        wire_type: (key & 0x7) as u8,
    }
}

/// Step over the value of a field with the given wire type.
pub fn skip_field(wire_type: u8, cursor: &mut ByteCursor) -> Result<(), DecodeError> {
    match WireType::from_bits(wire_type) {
        Some(WireType::Varint) => {
            cursor.consume_varint()?;
        }
        Some(WireType::Fixed64) => {
            cursor.consume_bytes(8)?;
        }
        Some(WireType::Len) => {
            // Check the whole field before moving, so that a failure leaves
            // the cursor at the start of the length.
            let (len, len_size) = cursor.peek_varint()?;
            let mut probe = *cursor;
            probe.consume_bytes(len_size as u64)?;
            probe.consume_bytes(len)?;
            *cursor = probe;
        }
        Some(WireType::Fixed32) => {
            cursor.consume_bytes(4)?;
        }
        None => {
            return Err(DecodeError::new(
                ErrorKind::UnsupportedWireType(wire_type),
                cursor.position(),
            ));
        }
    }
    Ok(())
}

/// Reader for the fields of an embedded message with a declared length.
///
/// The end offset is fixed when the record is created. Every read first
/// checks that the value lies entirely before the end offset. If it does not,
/// the value is not consumed and the rest of the record is abandoned:
/// [`next_tag`](Record::next_tag) returns `None` from then on, and
/// [`finish`](Record::finish) discards the remaining bytes.
///
/// Use with a `while let` loop:
///
/// ```
/// # fn main() -> Result<(), onnx_graph::wire::DecodeError> {
/// use onnx_graph::wire::{ByteCursor, Record, WireType};
///
/// // A message containing field 1 = 150, preceded by its length.
/// let data = [0x03, 0x08, 0x96, 0x01];
/// let mut cursor = ByteCursor::new(&data);
/// let len = cursor.consume_varint()?;
///
/// let mut record = Record::new(&mut cursor, len, "Example");
/// let mut value = None;
/// while let Some(tag) = record.next_tag()? {
///     if tag.is(1, WireType::Varint) {
///         value = record.read_varint()?;
///     } else {
///         record.skip(tag)?;
///     }
/// }
/// record.finish()?;
///
/// assert_eq!(value, Some(150));
/// assert!(cursor.at_end());
/// # Ok(()) }
/// ```
pub struct Record<'c, 'a> {
    cursor: &'c mut ByteCursor<'a>,
    end: usize,

    /// Debug name of the message type.
    context: &'static str,

    /// Field number of the tag most recently returned by `next_tag`.
    field: Option<u64>,

    /// Set when a value crossed the end offset.
    abandoned: bool,
}

impl<'c, 'a> Record<'c, 'a> {
    /// Begin reading a message of `len` bytes starting at the cursor's
    /// current offset.
    ///
    /// The end offset may lie beyond the end of the data if the file is
    /// truncated. Reads then fail with
    /// [`UnexpectedEndOfInput`](ErrorKind::UnexpectedEndOfInput) once the
    /// data runs out.
    pub fn new(cursor: &'c mut ByteCursor<'a>, len: u64, context: &'static str) -> Self {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        Self {
            end: cursor.position().saturating_add(len),
            cursor,
            context,
            field: None,
            abandoned: false,
        }
    }

    /// Offset of the first byte after this record.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Return true if a value crossed the end offset and the remaining fields
    /// were abandoned.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Read the key of the next field.
    ///
    /// Returns `Ok(None)` at the end of the record.
    pub fn next_tag(&mut self) -> Result<Option<Tag>, DecodeError> {
        self.field = None;
        if self.abandoned || self.cursor.position() >= self.end {
            return Ok(None);
        }
        let Some(key) = self.read_varint()? else {
            return Ok(None);
        };
        let tag = decode_tag(key);
        self.field = Some(tag.field);
        Ok(Some(tag))
    }

    /// Read a varint value.
    ///
    /// Returns `Ok(None)` if the varint would end after the record.
    pub fn read_varint(&mut self) -> Result<Option<u64>, DecodeError> {
        let (value, len) = match self.cursor.peek_varint() {
            Ok(value) => value,
            // Unterminated before the end of the data, but the data continues
            // past the end of the record.
            Err(err) if err.is_end_of_input() && self.end < self.cursor.len() => {
                self.abandon("varint");
                return Ok(None);
            }
            Err(err) => return Err(self.error(err)),
        };
        if !self.fits(len as u64) {
            self.abandon("varint");
            return Ok(None);
        }
        self.cursor.consume_bytes(len as u64).map_err(|err| self.error(err))?;
        Ok(Some(value))
    }

    /// Read a 32-bit fixed-width value.
    ///
    /// Returns `Ok(None)` if the value would end after the record.
    pub fn read_fixed32(&mut self) -> Result<Option<[u8; 4]>, DecodeError> {
        if !self.fits(4) {
            self.abandon("fixed32");
            return Ok(None);
        }
        self.cursor.consume_fixed32().map(Some).map_err(|err| self.error(err))
    }

    /// Read the length prefix of a length-delimited field.
    ///
    /// This checks that the content also fits in the record, but leaves the
    /// cursor at the start of the content. It is used before decoding an
    /// embedded message from [`cursor`](Record::cursor).
    ///
    /// Returns `Ok(None)` if the field would end after the record.
    pub fn read_len(&mut self) -> Result<Option<u64>, DecodeError> {
        let Some(len) = self.read_varint()? else {
            return Ok(None);
        };
        if !self.fits(len) {
            self.abandon("length-delimited");
            return Ok(None);
        }
        Ok(Some(len))
    }

    /// Read the content of a length-delimited field.
    ///
    /// Returns `Ok(None)` if the field would end after the record.
    pub fn read_bytes(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        self.cursor.consume_bytes(len).map(Some).map_err(|err| self.error(err))
    }

    /// Skip over the value of a field that is not needed.
    pub fn skip(&mut self, tag: Tag) -> Result<(), DecodeError> {
        tracing::trace!(
            record = self.context,
            field = tag.field,
            wire_type = tag.wire_type,
            offset = self.cursor.position(),
            "skipping field"
        );
        match WireType::from_bits(tag.wire_type) {
            Some(WireType::Varint) => {
                self.read_varint()?;
            }
            Some(WireType::Fixed64) => {
                if self.fits(8) {
                    self.cursor.consume_bytes(8).map_err(|err| self.error(err))?;
                } else {
                    self.abandon("fixed64");
                }
            }
            Some(WireType::Len) => {
                self.read_bytes()?;
            }
            Some(WireType::Fixed32) => {
                self.read_fixed32()?;
            }
            None => {
                let err = DecodeError::new(
                    ErrorKind::UnsupportedWireType(tag.wire_type),
                    self.cursor.position(),
                );
                return Err(self.error(err));
            }
        }
        Ok(())
    }

    /// Return the underlying cursor, for decoding an embedded message whose
    /// length was read with [`read_len`](Record::read_len).
    pub fn cursor(&mut self) -> &mut ByteCursor<'a> {
        &mut *self.cursor
    }

    /// Discard any unread bytes so that the cursor is positioned exactly at
    /// the end of the record.
    pub fn finish(self) -> Result<(), DecodeError> {
        let context = self.context;
        self.cursor
            .skip_to(self.end)
            .map_err(|err| err.with_context(context, None))
    }

    fn fits(&self, len: u64) -> bool {
        let remaining = self.end.saturating_sub(self.cursor.position());
        len <= remaining as u64
    }

    fn abandon(&mut self, what: &'static str) {
        tracing::trace!(
            record = self.context,
            field = self.field,
            offset = self.cursor.position(),
            end = self.end,
            "{} value crosses end of record, abandoning remaining fields",
            what
        );
        self.abandoned = true;
    }

    fn error(&self, err: DecodeError) -> DecodeError {
        err.with_context(self.context, self.field)
    }
}
