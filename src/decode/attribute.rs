use crate::decode::{read_name, DecodeRecord};
use crate::model::{AttributeValue, Node};
use crate::options::DecodeOptions;
use crate::wire::{DecodeError, Record, WireType};

/// Names of attributes stored from the repeated `ints` field.
const INT_LIST_ATTRS: [&str; 5] = ["strides", "dilations", "pads", "kernel_shape", "allowzero"];

/// Names of attributes stored from the scalar `i` field, if non-zero.
const INT_ATTRS: [&str; 3] = ["group", "transA", "transB"];

/// Names of attributes stored from the scalar `f` field, if non-zero.
const FLOAT_ATTRS: [&str; 2] = ["alpha", "beta"];

/// Decoder for `AttributeProto` messages.
///
/// The declared attribute type is ignored. Instead the value is classified by
/// the attribute's name and which fields were present, and written into the
/// node's attribute maps after the whole record has been read.
pub(crate) struct AttributeDecoder;

impl AttributeDecoder {
    const NAME: u64 = 1;
    const F: u64 = 2;
    const I: u64 = 3;
    const S: u64 = 6;
    const FLOATS: u64 = 7;
    const INTS: u64 = 8;
    const TYPE: u64 = 20;

    // Numbering from onnx.proto.
    const SCHEMA_S: u64 = 4;
}

/// Values read from one attribute record.
#[derive(Debug, Default)]
struct AttributeFields {
    name: String,
    float: f32,
    int: Option<i64>,
    string: String,
    ints: Vec<i64>,
}

impl AttributeFields {
    /// Store the attribute in `node`. Later steps replace the values written
    /// by earlier ones.
    fn commit(self, node: &mut Node) {
        let name = self.name.as_str();
        let int = self.int.unwrap_or(0);
        let mut stored = false;

        if !self.ints.is_empty() && INT_LIST_ATTRS.contains(&name) {
            node.set_attr(name, AttributeValue::Ints(self.ints));
            stored = true;
        } else if self.int.is_some() && int != 0 && INT_ATTRS.contains(&name) {
            node.set_attr(name, AttributeValue::Ints(vec![int]));
            stored = true;
        }

        // Zero is a meaningful value for this flag.
        if name == "allowzero" {
            node.set_attr(name, AttributeValue::Ints(vec![int]));
            stored = true;
        }

        if self.float != 0.0 && FLOAT_ATTRS.contains(&name) {
            node.set_attr(name, AttributeValue::Float(self.float));
            stored = true;
        }

        if !self.string.is_empty() {
            node.set_attr(name, AttributeValue::String(self.string));
            stored = true;
        }

        if !stored {
            tracing::trace!(name, "attribute has no stored value");
        }
    }
}

impl DecodeRecord for AttributeDecoder {
    const MESSAGE: &'static str = "AttributeProto";

    type Target = Node;

    fn decode_fields(
        record: &mut Record<'_, '_>,
        node: &mut Node,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        let mut attr = AttributeFields::default();

        while let Some(tag) = record.next_tag()? {
            match (tag.field, WireType::from_bits(tag.wire_type)) {
                (Self::NAME, Some(WireType::Len)) => {
                    if let Some(name) = read_name(record)? {
                        attr.name = name;
                    }
                }
                (Self::F, Some(WireType::Fixed32)) => {
                    if let Some(bytes) = record.read_fixed32()? {
                        attr.float = f32::from_le_bytes(bytes);
                    }
                }
                (Self::I, Some(WireType::Varint)) => {
                    if let Some(int) = record.read_varint()? {
                        attr.int = Some(int as i64);
                    }
                }
                (field, Some(WireType::Len))
                    if field == Self::S || (options.schema_fields && field == Self::SCHEMA_S) =>
                {
                    if let Some(string) = read_name(record)? {
                        attr.string = string;
                    }
                }
                (Self::FLOATS, Some(WireType::Len)) => {
                    // Float lists are not stored.
                    record.read_bytes()?;
                }
                (Self::INTS, Some(WireType::Varint)) => {
                    if let Some(int) = record.read_varint()? {
                        attr.ints.push(int as i64);
                    }
                }
                (Self::TYPE, Some(WireType::Varint)) => {
                    record.read_varint()?;
                }
                _ => record.skip(tag)?,
            }
        }

        attr.commit(node);
        Ok(())
    }
}
