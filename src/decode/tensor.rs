use crate::decode::{read_name, DecodeRecord};
use crate::model::{DataType, Tensor};
use crate::options::DecodeOptions;
use crate::wire::{ByteCursor, DecodeError, Record, WireType};

/// Decoder for `TensorProto` messages.
pub(crate) struct TensorDecoder;

impl TensorDecoder {
    const DIMS: u64 = 1;
    const DATA_TYPE: u64 = 2;
    const NAME: u64 = 3;
    const FLOAT_DATA: u64 = 5;
    const RAW_DATA: u64 = 9;

    // Numbering from onnx.proto.
    const SCHEMA_FLOAT_DATA: u64 = 4;
    const SCHEMA_NAME: u64 = 8;
}

impl DecodeRecord for TensorDecoder {
    const MESSAGE: &'static str = "TensorProto";

    type Target = Tensor;

    fn decode_fields(
        record: &mut Record<'_, '_>,
        tensor: &mut Tensor,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        let schema = options.schema_fields;
        while let Some(tag) = record.next_tag()? {
            match (tag.field, WireType::from_bits(tag.wire_type)) {
                (Self::DIMS, Some(WireType::Varint)) => {
                    if let Some(dim) = record.read_varint()? {
                        tensor.push_dim(dim as i64);
                    }
                }
                (Self::DIMS, Some(WireType::Len)) => {
                    if let Some(packed) = record.read_bytes()? {
                        let start = record.position() - packed.len();
                        decode_packed_dims(packed, start, tensor)?;
                    }
                }
                (Self::DATA_TYPE, Some(WireType::Varint)) => {
                    if let Some(code) = record.read_varint()? {
                        match i32::try_from(code as i64) {
                            Ok(code) => tensor.set_data_type(DataType(code)),
                            Err(_) => tracing::trace!(code, "ignoring out of range data type"),
                        }
                    }
                }
                (field, Some(WireType::Len))
                    if field == Self::NAME || (schema && field == Self::SCHEMA_NAME) =>
                {
                    if let Some(name) = read_name(record)? {
                        tensor.set_name(name);
                    }
                }
                (field, Some(WireType::Len))
                    if field == Self::FLOAT_DATA
                        || field == Self::RAW_DATA
                        || (schema && field == Self::SCHEMA_FLOAT_DATA) =>
                {
                    if let Some(data) = record.read_bytes()? {
                        tensor.set_data(data);
                    }
                }
                _ => record.skip(tag)?,
            }
        }
        Ok(())
    }
}

/// Append the varints in a packed `dims` field to the tensor's shape.
///
/// A varint truncated by the end of the field ends the list. `start` is the
/// offset of the field's content in the model data.
fn decode_packed_dims(packed: &[u8], start: usize, tensor: &mut Tensor) -> Result<(), DecodeError> {
    let mut cursor = ByteCursor::new(packed);
    while !cursor.at_end() {
        match cursor.consume_varint() {
            Ok(dim) => tensor.push_dim(dim as i64),
            Err(err) if err.is_end_of_input() => break,
            Err(err) => {
                return Err(err
                    .offset_by(start)
                    .with_context(TensorDecoder::MESSAGE, Some(TensorDecoder::DIMS)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use onnx_graph_testing::{encode_varint, MessageBuilder, TestCases};

    use super::TensorDecoder;
    use crate::decode::DecodeRecord;
    use crate::model::{DataType, Tensor};
    use crate::options::DecodeOptions;
    use crate::wire::{ByteCursor, ErrorKind};

    fn decode(message: &[u8], options: &DecodeOptions) -> Tensor {
        let mut cursor = ByteCursor::new(message);
        let mut tensor = Tensor::default();
        TensorDecoder::decode_bounded(&mut cursor, message.len() as u64, &mut tensor, options)
            .unwrap();
        assert_eq!(cursor.position(), message.len());
        tensor
    }

    #[test]
    fn test_decode_tensor() {
        let message = MessageBuilder::new()
            .varint(1, 16)
            .varint(1, 3)
            .varint(1, 3)
            .varint(1, 3)
            .varint(2, 1)
            .string(3, "conv1.weight")
            .bytes(9, [1, 2, 3, 4])
            .into_bytes();

        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.name(), "conv1.weight");
        assert_eq!(tensor.dims(), [16, 3, 3, 3]);
        assert_eq!(tensor.data_type(), DataType::FLOAT);
        assert_eq!(tensor.data(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_payload_last_write_wins() {
        #[derive(Debug)]
        struct Case {
            fields: Vec<(u64, Vec<u8>)>,
            expected: Vec<u8>,
        }

        let cases = [
            Case {
                fields: vec![(5, vec![1, 1]), (9, vec![2, 2])],
                expected: vec![2, 2],
            },
            Case {
                fields: vec![(9, vec![2, 2]), (5, vec![1, 1])],
                expected: vec![1, 1],
            },
            Case {
                // Field 4 is only a payload with `schema_fields` enabled.
                fields: vec![(9, vec![2, 2]), (4, vec![3, 3])],
                expected: vec![2, 2],
            },
        ];

        cases.test_each(|case| {
            let mut builder = MessageBuilder::new();
            for (field, data) in &case.fields {
                builder = builder.bytes(*field, data);
            }
            let tensor = decode(&builder.into_bytes(), &DecodeOptions::default());
            assert_eq!(tensor.data(), case.expected);
        })
    }

    #[test]
    fn test_schema_fields_ignored_by_default() {
        let message = MessageBuilder::new()
            .string(3, "w")
            .string(8, "other")
            .bytes(4, [1, 2, 3, 4])
            .bytes(9, [9])
            .string(4, "zz")
            .into_bytes();

        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.name(), "w");
        assert_eq!(tensor.data(), [9]);
    }

    #[test]
    fn test_schema_fields() {
        let message = MessageBuilder::new()
            .string(8, "bias")
            .bytes(4, [0, 0, 128, 63])
            .into_bytes();

        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.name(), "");
        assert!(tensor.data().is_empty());

        let tensor = decode(&message, DecodeOptions::default().schema_fields(true));
        assert_eq!(tensor.name(), "bias");
        assert_eq!(tensor.data(), [0, 0, 128, 63]);
    }

    #[test]
    fn test_packed_dims() {
        let packed: Vec<u8> = [1u64, 64, 300].iter().flat_map(|d| encode_varint(*d)).collect();
        let message = MessageBuilder::new().bytes(1, packed).into_bytes();
        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.dims(), [1, 64, 300]);
    }

    #[test]
    fn test_data_type_out_of_range() {
        let message = MessageBuilder::new()
            .varint(2, 1)
            .varint(2, i32::MAX as u64 + 2)
            .into_bytes();
        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.data_type(), DataType::FLOAT);

        // Negative codes are sign-extended to 64 bits.
        let message = MessageBuilder::new().varint(2, -1i64 as u64).into_bytes();
        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.data_type(), DataType(-1));
    }

    #[test]
    fn test_packed_dims_error_offset() {
        let packed = [vec![0xff; 10], vec![0x01]].concat();
        let message = MessageBuilder::new()
            .varint(2, 1)
            .bytes(1, packed)
            .into_bytes();

        let mut cursor = ByteCursor::new(&message);
        let mut tensor = Tensor::default();
        let err = TensorDecoder::decode_bounded(
            &mut cursor,
            message.len() as u64,
            &mut tensor,
            &DecodeOptions::default(),
        )
        .err()
        .unwrap();

        // Data type field (2 bytes), then the dims key and length.
        assert_eq!(err.kind(), &ErrorKind::VarintTooLong);
        assert_eq!(err.offset(), 4);
        assert_eq!(err.context(), Some("TensorProto"));
        assert_eq!(err.field(), Some(1));
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let message = MessageBuilder::new()
            .varint(2, 7)
            .fixed64(10, 0)
            .message(13, MessageBuilder::new().string(1, "location").into_bytes())
            .varint(14, 1)
            // Name with the wrong wire type.
            .varint(3, 5)
            .string(3, "ids")
            .into_bytes();

        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.data_type(), DataType::INT64);
        assert_eq!(tensor.name(), "ids");
    }

    #[test]
    fn test_sanitized_name() {
        let message = MessageBuilder::new().string(3, "onnx::Conv_12").into_bytes();
        let tensor = decode(&message, &DecodeOptions::default());
        assert_eq!(tensor.name(), "onnx");
    }
}
