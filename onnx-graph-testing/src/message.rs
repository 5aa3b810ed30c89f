/// Encode a value as a Protocol Buffers varint.
///
/// ```
/// use onnx_graph_testing::encode_varint;
///
/// assert_eq!(encode_varint(1), [0x01]);
/// assert_eq!(encode_varint(300), [0xac, 0x02]);
/// ```
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return buf;
        }
        buf.push(byte | 0x80);
    }
}

/// Builder for the serialized fields of a Protocol Buffers message.
///
/// Nested messages are built separately and added with
/// [`message`](MessageBuilder::message).
///
/// ```
/// use onnx_graph_testing::MessageBuilder;
///
/// let attr = MessageBuilder::new()
///     .string(1, "kernel_shape")
///     .varint(8, 3)
///     .varint(8, 3)
///     .into_bytes();
/// let node = MessageBuilder::new()
///     .string(4, "Conv")
///     .message(5, attr)
///     .into_bytes();
/// assert_eq!(&node[..6], [0x22, 0x04, b'C', b'o', b'n', b'v']);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field key with a raw wire type, which may be invalid.
    pub fn key(mut self, field: u64, wire_type: u8) -> Self {
        self.buf.extend(encode_varint((field << 3) | (wire_type as u64 & 0x7)));
        self
    }

    /// Append a varint field.
    pub fn varint(self, field: u64, value: u64) -> Self {
        self.key(field, 0).raw(encode_varint(value))
    }

    /// Append a 64-bit fixed-width field.
    pub fn fixed64(self, field: u64, value: u64) -> Self {
        self.key(field, 1).raw(value.to_le_bytes())
    }

    /// Append a 32-bit fixed-width field.
    pub fn fixed32(self, field: u64, value: u32) -> Self {
        self.key(field, 5).raw(value.to_le_bytes())
    }

    /// Append a `float` field.
    pub fn float(self, field: u64, value: f32) -> Self {
        self.fixed32(field, value.to_bits())
    }

    /// Append a length-delimited field.
    pub fn bytes(self, field: u64, value: impl AsRef<[u8]>) -> Self {
        let value = value.as_ref();
        self.key(field, 2)
            .raw(encode_varint(value.len() as u64))
            .raw(value)
    }

    /// Append a `string` field.
    pub fn string(self, field: u64, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    /// Append an embedded message field.
    pub fn message(self, field: u64, message: impl AsRef<[u8]>) -> Self {
        self.bytes(field, message)
    }

    /// Append bytes without any key or length.
    pub fn raw(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.buf.extend_from_slice(bytes.as_ref());
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
