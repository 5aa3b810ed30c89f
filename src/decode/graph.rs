use crate::decode::node::NodeDecoder;
use crate::decode::tensor::TensorDecoder;
use crate::decode::{read_name, DecodeRecord};
use crate::model::{Graph, Node, Tensor};
use crate::options::DecodeOptions;
use crate::wire::{DecodeError, Record, WireType};

/// Decoder for `GraphProto` messages.
///
/// Nodes and initializers are added to the graph as soon as each one has been
/// decoded, so a graph whose data ends early retains everything before the
/// point where the data ran out.
pub(crate) struct GraphDecoder;

impl GraphDecoder {
    const NODE: u64 = 1;
    const NAME: u64 = 2;
    const INITIALIZER: u64 = 5;
    const INPUT: u64 = 11;
    const OUTPUT: u64 = 12;
}

impl DecodeRecord for GraphDecoder {
    const MESSAGE: &'static str = "GraphProto";

    type Target = Graph;

    fn decode_fields(
        record: &mut Record<'_, '_>,
        graph: &mut Graph,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        while let Some(tag) = record.next_tag()? {
            if WireType::from_bits(tag.wire_type) != Some(WireType::Len) {
                record.skip(tag)?;
                continue;
            }

            match tag.field {
                Self::NODE => {
                    if let Some(len) = record.read_len()? {
                        let mut node = Node::default();
                        NodeDecoder::decode_bounded(record.cursor(), len, &mut node, options)?;
                        graph.push_node(node);
                    }
                }
                Self::NAME => {
                    if let Some(name) = read_name(record)? {
                        graph.set_name(name);
                    }
                }
                Self::INITIALIZER => {
                    if let Some(len) = record.read_len()? {
                        let mut tensor = Tensor::default();
                        TensorDecoder::decode_bounded(record.cursor(), len, &mut tensor, options)?;
                        graph.insert_initializer(tensor);
                    }
                }
                Self::INPUT | Self::OUTPUT if options.graph_io => {
                    if let Some(len) = record.read_len()? {
                        let mut name = String::new();
                        ValueInfoDecoder::decode_bounded(
                            record.cursor(),
                            len,
                            &mut name,
                            options,
                        )?;
                        if tag.field == Self::INPUT {
                            graph.push_input(name);
                        } else {
                            graph.push_output(name);
                        }
                    }
                }
                _ => record.skip(tag)?,
            }
        }
        Ok(())
    }
}

/// Decoder for the name of a `ValueInfoProto` message.
///
/// The type information is not used.
struct ValueInfoDecoder;

impl ValueInfoDecoder {
    const NAME: u64 = 1;
}

impl DecodeRecord for ValueInfoDecoder {
    const MESSAGE: &'static str = "ValueInfoProto";

    type Target = String;

    fn decode_fields(
        record: &mut Record<'_, '_>,
        name: &mut String,
        _options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        while let Some(tag) = record.next_tag()? {
            if tag.is(Self::NAME, WireType::Len) {
                if let Some(value) = read_name(record)? {
                    *name = value;
                }
            } else {
                record.skip(tag)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use onnx_graph_testing::MessageBuilder;

    use super::GraphDecoder;
    use crate::decode::DecodeRecord;
    use crate::model::Graph;
    use crate::options::DecodeOptions;
    use crate::wire::ByteCursor;

    fn decode(message: &[u8], options: &DecodeOptions) -> Graph {
        let mut cursor = ByteCursor::new(message);
        let mut graph = Graph::default();
        GraphDecoder::decode_bounded(&mut cursor, message.len() as u64, &mut graph, options)
            .unwrap();
        assert_eq!(cursor.position(), message.len());
        graph
    }

    fn node(op_type: &str, inputs: &[&str], output: &str) -> Vec<u8> {
        let mut builder = MessageBuilder::new();
        for input in inputs {
            builder = builder.string(1, input);
        }
        builder.string(2, output).string(4, op_type).into_bytes()
    }

    fn tensor(name: &str, data: &[u8]) -> Vec<u8> {
        MessageBuilder::new()
            .varint(1, data.len() as u64)
            .varint(2, 2)
            .string(3, name)
            .bytes(9, data)
            .into_bytes()
    }

    fn value_info(name: &str) -> Vec<u8> {
        let tensor_type = MessageBuilder::new().varint(1, 1).into_bytes();
        let type_proto = MessageBuilder::new().message(1, tensor_type).into_bytes();
        MessageBuilder::new().string(1, name).message(2, type_proto).into_bytes()
    }

    fn sample_graph() -> Vec<u8> {
        MessageBuilder::new()
            .message(1, node("Conv", &["x", "w"], "y"))
            .string(2, "main_graph")
            .message(5, tensor("w", &[1, 2, 3]))
            .message(1, node("Relu", &["y"], "z"))
            .message(11, value_info("x"))
            .message(12, value_info("z"))
            .message(13, value_info("y"))
            .into_bytes()
    }

    #[test]
    fn test_decode_graph() {
        let graph = decode(&sample_graph(), &DecodeOptions::default());

        assert_eq!(graph.name(), "main_graph");
        let ops: Vec<_> = graph.nodes().iter().map(|n| n.op_type()).collect();
        assert_eq!(ops, ["Conv", "Relu"]);

        let weight = graph.initializer("w").unwrap();
        assert_eq!(weight.dims(), [3]);
        assert_eq!(weight.data(), [1, 2, 3]);

        // Inputs and outputs are only decoded on request.
        assert!(graph.inputs().is_empty());
        assert!(graph.outputs().is_empty());
    }

    #[test]
    fn test_decode_graph_io() {
        let graph = decode(&sample_graph(), DecodeOptions::default().graph_io(true));
        assert_eq!(graph.inputs(), ["x"]);
        assert_eq!(graph.outputs(), ["z"]);
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn test_duplicate_initializer() {
        let message = MessageBuilder::new()
            .message(5, tensor("w", &[1]))
            .message(5, tensor("b", &[2]))
            .message(5, tensor("w", &[3, 4]))
            .into_bytes();

        let graph = decode(&message, &DecodeOptions::default());
        assert_eq!(graph.initializers().len(), 2);
        assert_eq!(graph.initializer("w").unwrap().data(), [3, 4]);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let message = MessageBuilder::new()
            .varint(20, 1)
            .string(10, "doc")
            .message(1, node("Relu", &["x"], "y"))
            .message(15, MessageBuilder::new().string(1, "sparse").into_bytes())
            .fixed64(21, 0)
            .message(1, node("Sigmoid", &["y"], "z"))
            .into_bytes();

        let graph = decode(&message, &DecodeOptions::default());
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.nodes()[1].op_type(), "Sigmoid");
    }

    #[test]
    fn test_truncated_graph_keeps_decoded_nodes() {
        let message = sample_graph();
        let truncated = &message[..message.len() / 2];

        let mut cursor = ByteCursor::new(truncated);
        let mut graph = Graph::default();
        let err = GraphDecoder::decode_bounded(
            &mut cursor,
            message.len() as u64,
            &mut graph,
            &DecodeOptions::default(),
        )
        .err()
        .unwrap();

        assert!(err.is_end_of_input());
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.nodes()[0].op_type(), "Conv");
    }
}
