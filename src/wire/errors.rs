use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::wire::varint::VarintError;

/// Errors decoding a model file.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeError {
    kind: ErrorKind,
    offset: usize,
    context: Option<&'static str>,
    field: Option<u64>,
}

impl DecodeError {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            context: None,
            field: None,
        }
    }

    pub(crate) fn from_varint(err: VarintError, offset: usize) -> Self {
        let kind = match err {
            VarintError::Eof => ErrorKind::UnexpectedEndOfInput,
            VarintError::TooLong => ErrorKind::VarintTooLong,
        };
        Self::new(kind, offset)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Offset into the model data at which the failing read started.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the message type associated with this error.
    pub fn context(&self) -> Option<&str> {
        self.context
    }

    /// Return the field number associated with this error.
    pub fn field(&self) -> Option<u64> {
        self.field
    }

    /// Return true if this error means the data ended before a value that it
    /// declared was complete.
    pub fn is_end_of_input(&self) -> bool {
        self.kind == ErrorKind::UnexpectedEndOfInput
    }

    /// Shift the offset of an error from a sub-slice of the data which starts
    /// at `base`.
    pub(crate) fn offset_by(mut self, base: usize) -> Self {
        self.offset += base;
        self
    }

    /// Associate a message type and field number with this error, unless
    /// a more specific context was already recorded.
    pub fn with_context(mut self, context: &'static str, field: Option<u64>) -> Self {
        if self.context.is_none() {
            self.context = Some(context);
            self.field = field;
        }
        self
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)?;
        if let Some(context) = self.context {
            write!(f, " in {}", context)?;
            if let Some(field) = self.field {
                write!(f, " field {}", field)?;
            }
        }
        Ok(())
    }
}

impl Error for DecodeError {}

/// Enum describing the kind of a [`DecodeError`] error.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The data ended before the requested bytes or the end of a varint were
    /// available.
    UnexpectedEndOfInput,

    /// A varint had more continuation bytes than fit in 64 bits.
    VarintTooLong,

    /// A field key had a wire type other than varint, 64-bit, length-delimited
    /// or 32-bit.
    ///
    /// This includes the deprecated group start/end types.
    UnsupportedWireType(u8),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::UnexpectedEndOfInput => write!(f, "unexpected end of input"),
            ErrorKind::VarintTooLong => write!(f, "varint too long"),
            ErrorKind::UnsupportedWireType(wire_type) => {
                write!(f, "unsupported wire type {}", wire_type)
            }
        }
    }
}
