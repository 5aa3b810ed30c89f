use crate::decode::attribute::AttributeDecoder;
use crate::decode::{read_name, DecodeRecord};
use crate::model::Node;
use crate::options::DecodeOptions;
use crate::wire::{DecodeError, Record, WireType};

/// Decoder for `NodeProto` messages.
pub(crate) struct NodeDecoder;

impl NodeDecoder {
    const INPUT: u64 = 1;
    const OUTPUT: u64 = 2;
    const NAME: u64 = 3;
    const OP_TYPE: u64 = 4;
    const ATTRIBUTE: u64 = 5;
}

impl DecodeRecord for NodeDecoder {
    const MESSAGE: &'static str = "NodeProto";

    type Target = Node;

    fn decode_fields(
        record: &mut Record<'_, '_>,
        node: &mut Node,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        while let Some(tag) = record.next_tag()? {
            if WireType::from_bits(tag.wire_type) != Some(WireType::Len) {
                record.skip(tag)?;
                continue;
            }

            match tag.field {
                Self::INPUT => {
                    if let Some(name) = read_name(record)? {
                        node.push_input(name);
                    }
                }
                Self::OUTPUT => {
                    if let Some(name) = read_name(record)? {
                        node.push_output(name);
                    }
                }
                Self::NAME => {
                    if let Some(name) = read_name(record)? {
                        node.set_name(name);
                    }
                }
                Self::OP_TYPE => {
                    if let Some(op_type) = read_name(record)? {
                        node.set_op_type(op_type);
                    }
                }
                Self::ATTRIBUTE => {
                    if let Some(len) = record.read_len()? {
                        AttributeDecoder::decode_bounded(record.cursor(), len, node, options)?;
                    }
                }
                _ => record.skip(tag)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use onnx_graph_testing::MessageBuilder;

    use super::NodeDecoder;
    use crate::decode::DecodeRecord;
    use crate::model::{AttributeValue, Node};
    use crate::options::DecodeOptions;
    use crate::wire::ByteCursor;

    fn decode(message: &[u8]) -> Node {
        let mut cursor = ByteCursor::new(message);
        let mut node = Node::default();
        NodeDecoder::decode_bounded(
            &mut cursor,
            message.len() as u64,
            &mut node,
            &DecodeOptions::default(),
        )
        .unwrap();
        assert_eq!(cursor.position(), message.len());
        node
    }

    fn kernel_shape() -> Vec<u8> {
        MessageBuilder::new()
            .string(1, "kernel_shape")
            .varint(8, 3)
            .varint(8, 3)
            .varint(20, 7)
            .into_bytes()
    }

    #[test]
    fn test_decode_conv_node() {
        let message = MessageBuilder::new()
            .string(1, "x")
            .string(1, "w")
            .string(2, "y")
            .string(3, "conv1")
            .string(4, "Conv")
            .message(5, kernel_shape())
            .into_bytes();

        let node = decode(&message);
        assert_eq!(node.op_type(), "Conv");
        assert_eq!(node.name(), Some("conv1"));
        assert_eq!(node.inputs(), ["x", "w"]);
        assert_eq!(node.outputs(), ["y"]);
        assert_eq!(node.get_ints("kernel_shape"), Some([3, 3].as_slice()));
        assert_eq!(node.int_list_attrs().len(), 1);
        assert!(node.float_attrs().is_empty());
        assert!(node.string_attrs().is_empty());
    }

    #[test]
    fn test_inputs_keep_order_and_duplicates() {
        let message = MessageBuilder::new()
            .string(1, "a")
            .string(1, "")
            .string(1, "a")
            .string(4, "Add")
            .into_bytes();

        let node = decode(&message);
        assert_eq!(node.inputs(), ["a", "", "a"]);
        assert!(node.outputs().is_empty());
        assert_eq!(node.name(), None);
    }

    #[test]
    fn test_last_op_type_wins() {
        let message = MessageBuilder::new()
            .string(4, "Relu")
            .string(4, "Gemm")
            .string(3, "first")
            .string(3, "second")
            .into_bytes();

        let node = decode(&message);
        assert_eq!(node.op_type(), "Gemm");
        assert_eq!(node.name(), Some("second"));
    }

    #[test]
    fn test_multiple_attributes() {
        let message = MessageBuilder::new()
            .string(4, "Gemm")
            .message(
                5,
                MessageBuilder::new()
                    .string(1, "alpha")
                    .float(2, 0.5)
                    .into_bytes(),
            )
            .message(
                5,
                MessageBuilder::new()
                    .string(1, "transB")
                    .varint(3, 1)
                    .into_bytes(),
            )
            .into_bytes();

        let node = decode(&message);
        assert_eq!(node.attr("alpha"), Some(AttributeValue::Float(0.5)));
        assert_eq!(node.attr("transB"), Some(AttributeValue::Ints(vec![1])));
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let message = MessageBuilder::new()
            .string(4, "Relu")
            .string(6, "a doc string")
            .string(7, "ai.onnx")
            .varint(10, 1)
            .fixed32(11, 0)
            .string(1, "x")
            .into_bytes();

        let node = decode(&message);
        assert_eq!(node.op_type(), "Relu");
        assert_eq!(node.inputs(), ["x"]);
    }

    #[test]
    fn test_attribute_crossing_end_of_node() {
        // The attribute declares more bytes than remain in the node, so it is
        // abandoned and the data after the node is left for the parent.
        let attr = kernel_shape();
        let mut message = MessageBuilder::new().string(4, "Conv").into_bytes();
        let node_len = message.len() + 3;
        message.extend(MessageBuilder::new().message(5, attr).into_bytes());

        let mut cursor = ByteCursor::new(&message);
        let mut node = Node::default();
        NodeDecoder::decode_bounded(
            &mut cursor,
            node_len as u64,
            &mut node,
            &DecodeOptions::default(),
        )
        .unwrap();

        assert_eq!(cursor.position(), node_len);
        assert_eq!(node.op_type(), "Conv");
        assert!(!node.has_attrs());
    }
}
