//! In-memory representation of a decoded model graph.
//!
//! These types are populated by the decoders in [`decode`](crate::decode)
//! and are read-only for users of the crate.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Element type code of a tensor.
///
/// Values correspond to the `TensorProto.DataType` enum in
/// [onnx.proto](https://github.com/onnx/onnx/blob/main/onnx/onnx.proto). Codes
/// without a named constant are preserved as-is.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataType(pub i32);

impl DataType {
    pub const UNDEFINED: Self = Self(0);
    pub const FLOAT: Self = Self(1);
    pub const UINT8: Self = Self(2);
    pub const INT8: Self = Self(3);
    pub const UINT16: Self = Self(4);
    pub const INT16: Self = Self(5);
    pub const INT32: Self = Self(6);
    pub const INT64: Self = Self(7);
    pub const STRING: Self = Self(8);
    pub const BOOL: Self = Self(9);
    pub const FLOAT16: Self = Self(10);
    pub const DOUBLE: Self = Self(11);
    pub const UINT32: Self = Self(12);
    pub const UINT64: Self = Self(13);

    /// Return the upper-case ONNX name of this type, if it is one of the
    /// named constants.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::UNDEFINED => "UNDEFINED",
            Self::FLOAT => "FLOAT",
            Self::UINT8 => "UINT8",
            Self::INT8 => "INT8",
            Self::UINT16 => "UINT16",
            Self::INT16 => "INT16",
            Self::INT32 => "INT32",
            Self::INT64 => "INT64",
            Self::STRING => "STRING",
            Self::BOOL => "BOOL",
            Self::FLOAT16 => "FLOAT16",
            Self::DOUBLE => "DOUBLE",
            Self::UINT32 => "UINT32",
            Self::UINT64 => "UINT64",
            _ => return None,
        };
        Some(name)
    }

    /// Return the size of one element in bytes, for fixed-size types.
    pub fn size_in_bytes(self) -> Option<usize> {
        let size = match self {
            Self::UINT8 | Self::INT8 | Self::BOOL => 1,
            Self::UINT16 | Self::INT16 | Self::FLOAT16 => 2,
            Self::FLOAT | Self::INT32 | Self::UINT32 => 4,
            Self::INT64 | Self::DOUBLE | Self::UINT64 => 8,
            _ => return None,
        };
        Some(size)
    }
}

/// A weight or constant tensor stored in the graph.
///
/// The element data is kept as the raw bytes from the file. Use
/// [`to_f32_vec`](Tensor::to_f32_vec) to interpret `FLOAT` data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Tensor {
    name: String,
    dims: SmallVec<[i64; 4]>,
    data_type: DataType,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "data_len", serialize_with = "serialize_len")
    )]
    data: Vec<u8>,
}

impl Tensor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Raw bytes of the most recently decoded data field.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Return the number of elements implied by the dimensions.
    ///
    /// A tensor with no dimensions is a scalar with one element. Returns
    /// `None` if a dimension is negative or the product overflows.
    pub fn element_count(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |count, &dim| {
            let dim = usize::try_from(dim).ok()?;
            count.checked_mul(dim)
        })
    }

    /// Interpret the data as little-endian `f32` values.
    ///
    /// Returns `None` unless the data type is `FLOAT` and the data length is a
    /// multiple of 4.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        if self.data_type != DataType::FLOAT || self.data.len() % 4 != 0 {
            return None;
        }
        let values = self
            .data
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Some(values)
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn push_dim(&mut self, dim: i64) {
        self.dims.push(dim);
    }

    pub(crate) fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
    }

    pub(crate) fn set_data(&mut self, data: &[u8]) {
        self.data = data.to_vec();
    }
}

#[cfg(feature = "serde")]
fn serialize_len<S: serde::Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(data.len() as u64)
}

/// Serialize a map in key order, so the output does not depend on hashing.
#[cfg(feature = "serde")]
fn serialize_sorted<S: serde::Serializer>(
    map: &FxHashMap<String, Tensor>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::Serialize;

    let sorted: BTreeMap<&String, &Tensor> = map.iter().collect();
    sorted.serialize(serializer)
}

/// Value of an operator attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Ints(Vec<i64>),
    String(String),
}

/// An operator in the graph.
///
/// Attributes are stored in one map per value type. A name is unique within
/// each map but the same name can be present in more than one map.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Node {
    op_type: String,
    name: Option<String>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    int_list_attrs: BTreeMap<String, Vec<i64>>,
    float_attrs: BTreeMap<String, f32>,
    string_attrs: BTreeMap<String, String>,
}

impl Node {
    /// Operator type, eg. "Conv". This is empty if the node had no type field.
    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Names of the input values, in order. Entries may be empty or repeated.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Names of the output values, in order.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn int_list_attrs(&self) -> &BTreeMap<String, Vec<i64>> {
        &self.int_list_attrs
    }

    pub fn float_attrs(&self) -> &BTreeMap<String, f32> {
        &self.float_attrs
    }

    pub fn string_attrs(&self) -> &BTreeMap<String, String> {
        &self.string_attrs
    }

    pub fn get_ints(&self, name: &str) -> Option<&[i64]> {
        self.int_list_attrs.get(name).map(|ints| ints.as_slice())
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.float_attrs.get(name).copied()
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.string_attrs.get(name).map(|s| s.as_str())
    }

    /// Look up an attribute by name.
    ///
    /// If the name is present in several maps, the integer-list value is
    /// preferred, then the float, then the string.
    pub fn attr(&self, name: &str) -> Option<AttributeValue> {
        if let Some(ints) = self.get_ints(name) {
            Some(AttributeValue::Ints(ints.to_vec()))
        } else if let Some(float) = self.get_float(name) {
            Some(AttributeValue::Float(float))
        } else {
            self.get_string(name)
                .map(|s| AttributeValue::String(s.to_string()))
        }
    }

    /// Return true if the node has no attributes in any map.
    pub fn has_attrs(&self) -> bool {
        !(self.int_list_attrs.is_empty() && self.float_attrs.is_empty() && self.string_attrs.is_empty())
    }

    pub(crate) fn set_op_type(&mut self, op_type: String) {
        self.op_type = op_type;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub(crate) fn push_input(&mut self, name: String) {
        self.inputs.push(name);
    }

    pub(crate) fn push_output(&mut self, name: String) {
        self.outputs.push(name);
    }

    /// Store an attribute value in the map for its type, replacing any
    /// previous value with the same name in that map.
    pub(crate) fn set_attr(&mut self, name: &str, value: AttributeValue) {
        let name = name.to_string();
        match value {
            AttributeValue::Float(float) => {
                self.float_attrs.insert(name, float);
            }
            AttributeValue::Ints(ints) => {
                self.int_list_attrs.insert(name, ints);
            }
            AttributeValue::String(string) => {
                self.string_attrs.insert(name, string);
            }
        }
    }
}

/// A decoded model graph together with model-level metadata.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Graph {
    format_version: i64,
    producer_name: String,
    producer_version: String,
    name: String,
    nodes: Vec<Node>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_sorted"))]
    initializers: FxHashMap<String, Tensor>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl Graph {
    /// Version of the file format (`ModelProto.ir_version`).
    pub fn format_version(&self) -> i64 {
        self.format_version
    }

    /// Name of the tool which produced the model, eg. "pytorch".
    pub fn producer_name(&self) -> &str {
        &self.producer_name
    }

    pub fn producer_version(&self) -> &str {
        &self.producer_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operators in the order they appear in the file.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Weights and constants, keyed by tensor name.
    pub fn initializers(&self) -> &FxHashMap<String, Tensor> {
        &self.initializers
    }

    pub fn initializer(&self, name: &str) -> Option<&Tensor> {
        self.initializers.get(name)
    }

    /// Names of the graph's inputs.
    ///
    /// This is only populated if [`graph_io`](crate::DecodeOptions::graph_io)
    /// was enabled when decoding.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Names of the graph's outputs.
    ///
    /// This is only populated if [`graph_io`](crate::DecodeOptions::graph_io)
    /// was enabled when decoding.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Return the index of the node which produces the value `name`.
    ///
    /// If several nodes list `name` as an output, the last one wins.
    pub fn producer_of(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .rposition(|node| node.outputs().iter().any(|output| output == name))
    }

    pub(crate) fn set_format_version(&mut self, version: i64) {
        self.format_version = version;
    }

    pub(crate) fn set_producer_name(&mut self, name: String) {
        self.producer_name = name;
    }

    pub(crate) fn set_producer_version(&mut self, version: String) {
        self.producer_version = version;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Add a tensor, replacing any existing tensor with the same name.
    pub(crate) fn insert_initializer(&mut self, tensor: Tensor) {
        if let Some(prev) = self.initializers.insert(tensor.name.clone(), tensor) {
            tracing::debug!(name = prev.name(), "replaced initializer with duplicate name");
        }
    }

    pub(crate) fn push_input(&mut self, name: String) {
        self.inputs.push(name);
    }

    pub(crate) fn push_output(&mut self, name: String) {
        self.outputs.push(name);
    }
}
