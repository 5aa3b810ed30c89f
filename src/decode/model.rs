use crate::decode::graph::GraphDecoder;
use crate::decode::DecodeRecord;
use crate::model::Graph;
use crate::options::DecodeOptions;
use crate::sanitize::lossy_text;
use crate::wire::{decode_tag, skip_field, ByteCursor, DecodeError, WireType};

/// Decoder for the top-level `ModelProto` message.
///
/// Unlike embedded messages, the model's fields extend to the end of the data.
struct ModelDecoder;

impl ModelDecoder {
    const MESSAGE: &'static str = "ModelProto";

    const IR_VERSION: u64 = 1;
    const PRODUCER_NAME: u64 = 2;
    const PRODUCER_VERSION: u64 = 3;
    const GRAPH: u64 = 7;

    /// Decode top-level fields into `graph`, stopping after the graph field.
    fn decode_fields(
        cursor: &mut ByteCursor,
        graph: &mut Graph,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        while !cursor.at_end() {
            let key = cursor
                .consume_varint()
                .map_err(|err| err.with_context(Self::MESSAGE, None))?;
            let tag = decode_tag(key);
            let context = |err: DecodeError| err.with_context(Self::MESSAGE, Some(tag.field));

            match (tag.field, WireType::from_bits(tag.wire_type)) {
                (Self::IR_VERSION, Some(WireType::Varint)) => {
                    let version = cursor.consume_varint().map_err(context)?;
                    graph.set_format_version(version as i64);
                }
                (Self::PRODUCER_NAME, Some(WireType::Len)) => {
                    let text = read_text(cursor).map_err(context)?;
                    graph.set_producer_name(text);
                }
                (Self::PRODUCER_VERSION, Some(WireType::Len)) => {
                    let text = read_text(cursor).map_err(context)?;
                    graph.set_producer_version(text);
                }
                (Self::GRAPH, Some(WireType::Len)) => {
                    let len = cursor.consume_varint().map_err(context)?;
                    GraphDecoder::decode_bounded(cursor, len, graph, options)?;

                    // Only one graph is expected. Anything after it is ignored.
                    break;
                }
                _ => {
                    tracing::trace!(
                        record = Self::MESSAGE,
                        field = tag.field,
                        wire_type = tag.wire_type,
                        offset = cursor.position(),
                        "skipping field"
                    );
                    skip_field(tag.wire_type, cursor).map_err(context)?;
                }
            }
        }
        Ok(())
    }
}

/// Read a length-delimited field as text.
fn read_text(cursor: &mut ByteCursor) -> Result<String, DecodeError> {
    let (len, len_size) = cursor.peek_varint()?;

    // Check the content is present before consuming the length, so a failure
    // leaves the cursor at the start of the field value.
    let mut probe = *cursor;
    probe.consume_bytes(len_size as u64)?;
    let bytes = probe.consume_bytes(len)?;
    *cursor = probe;

    Ok(lossy_text(bytes))
}

/// Decode a model from an in-memory buffer with the given options.
pub(crate) fn decode_model_with(data: &[u8], options: &DecodeOptions) -> Result<Graph, DecodeError> {
    let mut cursor = ByteCursor::new(data);
    let mut graph = Graph::default();

    match ModelDecoder::decode_fields(&mut cursor, &mut graph, options) {
        Ok(()) => {}
        Err(err) if err.is_end_of_input() && options.allow_truncated => {
            tracing::warn!(
                offset = err.offset(),
                len = data.len(),
                nodes = graph.nodes().len(),
                initializers = graph.initializers().len(),
                "model data is truncated, returning partial graph: {}",
                err
            );
        }
        Err(err) => return Err(err),
    }

    tracing::debug!(
        producer = graph.producer_name(),
        format_version = graph.format_version(),
        nodes = graph.nodes().len(),
        initializers = graph.initializers().len(),
        "decoded model"
    );

    Ok(graph)
}

/// Test whether a buffer contains an ONNX model.
///
/// ONNX models do not contain any magic bytes that would make detection simple.
/// Instead this scans the top-level fields, without decoding the graph, and
/// checks that the required `ir_version` field and a graph field are both
/// present and well formed.
///
/// ```
/// use onnx_graph::is_onnx_model;
///
/// assert!(!is_onnx_model(b"NOT AN ONNX MODEL"));
/// assert!(is_onnx_model(&[0x08, 0x07, 0x3a, 0x00]));
/// ```
pub fn is_onnx_model(data: &[u8]) -> bool {
    let mut cursor = ByteCursor::new(data);
    let mut ir_version = false;
    let mut graph = false;

    while !cursor.at_end() {
        let Ok(key) = cursor.consume_varint() else {
            return false;
        };
        let tag = decode_tag(key);
        if tag.is(ModelDecoder::IR_VERSION, WireType::Varint) {
            ir_version = true;
        } else if tag.is(ModelDecoder::GRAPH, WireType::Len) {
            graph = true;
        }
        if skip_field(tag.wire_type, &mut cursor).is_err() {
            return false;
        }
    }

    ir_version && graph
}
