//! Internal testing utilities for the onnx-graph crates.
//!
//! - [`TestCases`] runs table-driven tests.
//! - [`MessageBuilder`] and [`encode_varint`] produce Protocol Buffers data
//!   for use as test inputs.

mod cases;
mod message;

pub use cases::TestCases;
pub use message::{encode_varint, MessageBuilder};
