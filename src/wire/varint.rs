//! Decode varints from byte slices.
//!
//! Variable length integers (_varints_) are the default encoding of integers
//! in Protocol Buffers messages, including field keys and lengths.
//!
//! See <https://protobuf.dev/programming-guides/encoding/#varints>.

/// Maximum number of bytes for an encoded varint.
///
/// A decoded varint is a u64 value. Each byte contains 7 value bits and one
/// continuation bit. Hence we need 9 "full" bytes plus one bit from the 10th byte.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub enum VarintError {
    /// The buffer ended before a byte without the continuation bit was found.
    Eof,
    /// The varint has more continuation bytes than fit in 64 bits.
    TooLong,
}

/// Decode a varint from the start of `buf`.
///
/// Returns the value and the number of bytes it occupied. Bits of the 10th
/// byte which do not fit into a `u64` are discarded.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;
    let mut shift = 0;

    for (i, byte) in buf.iter().copied().enumerate() {
        // High bit is continuation bit. Low 7 bits are the payload.
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
        if shift >= 64 {
            return Err(VarintError::TooLong);
        }
    }

    Err(VarintError::Eof)
}
