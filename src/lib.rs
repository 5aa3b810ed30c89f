//! onnx-graph decodes [ONNX][onnx] model files into a lightweight graph of
//! operators and weights, without using generated Protocol Buffers code.
//!
//! # Usage
//!
//! To read a model from a file:
//!
//! ```no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let graph = onnx_graph::load_file("model.onnx")?;
//!
//!     println!(
//!         "Model produced by {} has {} operators and {} weights",
//!         graph.producer_name(),
//!         graph.nodes().len(),
//!         graph.initializers().len()
//!     );
//!
//!     for node in graph.nodes() {
//!         println!("{} {:?} -> {:?}", node.op_type(), node.inputs(), node.outputs());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! To decode an in-memory buffer use [`decode_model`]. To customize decoding,
//! use [`DecodeOptions`]. A decoded graph can be rendered as a
//! [Graphviz](https://graphviz.org) document using [`dot::render_dot`].
//!
//! # Decoding behavior
//!
//! The decoder is tolerant of damaged or unusual files:
//!
//! - Fields which are not understood are skipped.
//! - A value inside an embedded message that would extend past the end of that
//!   message is dropped, along with the rest of the message. Decoding resumes
//!   with the next field of the parent message.
//! - If the file ends part-way through, the graph decoded up to that point is
//!   returned. This can be disabled with [`DecodeOptions::allow_truncated`].
//!
//! Names of nodes, values and tensors are truncated at the first character
//! which is not an ASCII letter, digit, `_`, `.`, `-` or `/`. See
//! [`sanitize::clean_string`].
//!
//! Only a fixed set of operator attributes is stored. Integer attributes are
//! stored as lists, and scalar attributes with a zero value are omitted, except
//! for `allowzero`. See [`Node`] for details.
//!
//! [onnx]: https://onnx.ai/onnx/

// This is a crate for parsing potentially untrusted files, so it is preferable
// to avoid unsafe code.
#![forbid(unsafe_code)]

mod decode;
pub mod dot;
mod load_error;
mod model;
mod options;
pub mod sanitize;
pub mod wire;

use std::path::Path;

pub use decode::is_onnx_model;
pub use load_error::LoadError;
pub use model::{AttributeValue, DataType, Graph, Node, Tensor};
pub use options::DecodeOptions;
pub use wire::{DecodeError, ErrorKind};

/// Decode a model from an in-memory buffer using the default options.
///
/// ```
/// // ir_version = 7, followed by an empty graph.
/// let graph = onnx_graph::decode_model(&[0x08, 0x07, 0x3a, 0x00])?;
/// assert_eq!(graph.format_version(), 7);
/// assert!(graph.nodes().is_empty());
/// # Ok::<_, onnx_graph::DecodeError>(())
/// ```
pub fn decode_model(data: &[u8]) -> Result<Graph, DecodeError> {
    DecodeOptions::default().decode(data)
}

/// Read and decode a model file using the default options.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Graph, LoadError> {
    DecodeOptions::default().load_file(path)
}
