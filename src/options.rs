use std::path::Path;

use crate::decode::decode_model_with;
use crate::load_error::LoadError;
use crate::model::Graph;
use crate::wire::DecodeError;

/// Options which customize how a model is decoded.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use onnx_graph::DecodeOptions;
///
/// let graph = DecodeOptions::default()
///     .allow_truncated(false)
///     .graph_io(true)
///     .load_file("model.onnx")?;
/// println!("{} inputs", graph.inputs().len());
/// # Ok(()) }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeOptions {
    pub(crate) allow_truncated: bool,
    pub(crate) graph_io: bool,
    pub(crate) schema_fields: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            allow_truncated: true,
            graph_io: false,
            schema_fields: false,
        }
    }
}

impl DecodeOptions {
    /// Set whether data that ends part-way through a field is accepted.
    ///
    /// When enabled (the default), decoding stops at the point where the data
    /// runs out and the graph decoded up to that point is returned. When
    /// disabled, an [`UnexpectedEndOfInput`](crate::wire::ErrorKind::UnexpectedEndOfInput)
    /// error is returned instead.
    pub fn allow_truncated(&mut self, allow: bool) -> &mut Self {
        self.allow_truncated = allow;
        self
    }

    /// Set whether the names of the graph's inputs and outputs are decoded.
    ///
    /// This is disabled by default, in which case
    /// [`Graph::inputs`] and [`Graph::outputs`] are empty.
    pub fn graph_io(&mut self, enable: bool) -> &mut Self {
        self.graph_io = enable;
        self
    }

    /// Set whether the field numbers from the standard ONNX schema are
    /// recognized for tensor names, tensor `float_data` and string
    /// attributes, in addition to the legacy numbering.
    ///
    /// Disabled by default, in which case tensor fields 4 and 8 and attribute
    /// field 4 are skipped like any other unknown field.
    pub fn schema_fields(&mut self, enable: bool) -> &mut Self {
        self.schema_fields = enable;
        self
    }

    /// Decode a model from an in-memory buffer.
    pub fn decode(&self, data: &[u8]) -> Result<Graph, DecodeError> {
        decode_model_with(data, self)
    }

    /// Read and decode a model file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Graph, LoadError> {
        let data = std::fs::read(path)?;
        let graph = self.decode(&data)?;
        Ok(graph)
    }
}
