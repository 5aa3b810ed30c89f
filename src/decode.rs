//! Decoders which build a [`Graph`] from the messages in a model file.
//!
//! Each embedded message type has a decoder which reads the fields of one
//! [`Record`] into a target value. Embedded messages are decoded by calling
//! the child decoder with the record's cursor, after which the child's record
//! is finished so the parent resumes exactly after the child's bytes.

mod attribute;
mod graph;
mod model;
mod node;
mod tensor;

pub use model::is_onnx_model;
pub(crate) use model::decode_model_with;

use crate::options::DecodeOptions;
use crate::wire::{ByteCursor, DecodeError, Record};

/// Decoder for one embedded message type.
pub(crate) trait DecodeRecord {
    /// Message type name, used in errors and logs.
    const MESSAGE: &'static str;

    /// Value that decoded fields are written into.
    type Target;

    /// Decode fields from `record` until it is exhausted or abandoned.
    fn decode_fields(
        record: &mut Record<'_, '_>,
        target: &mut Self::Target,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError>;

    /// Decode a message of `len` bytes starting at the cursor's position.
    ///
    /// On success the cursor is positioned at the end of the message, whether
    /// or not every field in it was read.
    fn decode_bounded(
        cursor: &mut ByteCursor<'_>,
        len: u64,
        target: &mut Self::Target,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        let mut record = Record::new(cursor, len, Self::MESSAGE);
        Self::decode_fields(&mut record, target, options)?;
        record.finish()
    }
}

/// Read the contents of a length-delimited field, returning `None` if it
/// crossed the end of the record.
fn read_name(record: &mut Record<'_, '_>) -> Result<Option<String>, DecodeError> {
    let bytes = record.read_bytes()?;
    Ok(bytes.map(crate::sanitize::clean_string))
}
