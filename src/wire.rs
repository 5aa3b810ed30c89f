//! Low-level decoding of the Protocol Buffers wire format.
//!
//! ONNX files are serialized `ModelProto` messages. This module provides the
//! primitives needed to walk such a message without a generated schema:
//!
//! - [`ByteCursor`] holds the in-memory file and a read offset that only ever
//!   moves forwards.
//! - [`decode_tag`] splits a field key into a field number and wire type, and
//!   [`skip_field`] steps over a field whose contents are not needed.
//! - [`Record`] iterates over the fields of an embedded message whose length
//!   was declared by its parent. All reads through a `Record` are checked
//!   against the end of the message, so a malformed child can never consume
//!   bytes belonging to its siblings.
//!
//! See <https://protobuf.dev/programming-guides/encoding/> for a description
//! of the encoding.

mod cursor;
mod errors;
mod field;
pub mod varint;

pub use cursor::ByteCursor;
pub use errors::{DecodeError, ErrorKind};
pub use field::{decode_tag, skip_field, Record, Tag, WireType};
