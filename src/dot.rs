//! Render a decoded graph as a [Graphviz](https://graphviz.org) DOT document.
//!
//! The output only depends on the public accessors of [`Graph`] and [`Node`],
//! and is deterministic for a given graph.
//!
//! ```
//! let graph = onnx_graph::decode_model(&[])?;
//! let dot = onnx_graph::dot::render_dot(&graph);
//! assert!(dot.starts_with("digraph ONNX_Graph {"));
//! # Ok::<_, onnx_graph::DecodeError>(())
//! ```

use std::io::Write;

use crate::model::{Graph, Node};

/// Maximum number of values shown for an integer list attribute.
const MAX_LIST_VALUES: usize = 4;

/// Edges are labelled with the value name if it is shorter than this.
const MAX_EDGE_LABEL_LEN: usize = 30;

/// Fill color for an operator type.
fn node_color(op_type: &str) -> &'static str {
    match op_type {
        "Conv" => "lightblue",
        "Relu" => "lightgreen",
        "Gemm" => "lightyellow",
        "MatMul" => "lightcyan",
        "Add" => "lavender",
        "Mul" => "peachpuff",
        "Reshape" => "thistle",
        "Concat" => "plum",
        "Shape" => "lightgray",
        _ => "white",
    }
}

/// Shape for an operator type.
fn node_shape(op_type: &str) -> &'static str {
    match op_type {
        "Relu" => "ellipse",
        "Reshape" | "Concat" | "Shape" => "diamond",
        _ => "box",
    }
}

/// Escape text for use in a quoted DOT string.
fn escape_dot(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape text for use in an HTML-like label.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Return true if a node is drawn in the output.
fn is_rendered(node: &Node) -> bool {
    !node.op_type().is_empty() && node.op_type() != "Unknown"
}

/// Format an integer list, showing at most [`MAX_LIST_VALUES`] entries.
fn format_ints(values: &[i64]) -> String {
    let shown: Vec<String> = values
        .iter()
        .take(MAX_LIST_VALUES)
        .map(|v| v.to_string())
        .collect();
    let ellipsis = if values.len() > MAX_LIST_VALUES {
        "..."
    } else {
        ""
    };
    format!("[{}{}]", shown.join(","), ellipsis)
}

/// Return the label rows for a node's attributes.
fn attribute_rows(node: &Node) -> Vec<String> {
    let ints = node
        .int_list_attrs()
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| format!("{}={}", name, format_ints(values)));
    let floats = node
        .float_attrs()
        .iter()
        .map(|(name, value)| format!("{}={:.6}", name, value));
    let strings = node
        .string_attrs()
        .iter()
        .map(|(name, value)| format!("{}={}", name, value));
    ints.chain(floats).chain(strings).collect()
}

fn node_label(node: &Node) -> String {
    let op_type = node.op_type();
    let mut label = String::from(
        "<TABLE BORDER=\"1\" CELLBORDER=\"0\" CELLSPACING=\"2\" CELLPADDING=\"3\">",
    );
    label.push_str(&format!(
        "<TR><TD BGCOLOR=\"{}\"><B>{}</B></TD></TR>",
        node_color(op_type),
        escape_html(op_type)
    ));
    for row in attribute_rows(node) {
        label.push_str(&format!("<TR><TD>{}</TD></TR>", escape_html(&row)));
    }
    label.push_str("</TABLE>");
    label
}

/// Render `graph` as a DOT document.
///
/// The document contains:
///
/// - A legend explaining the colors of common operators.
/// - One node `n<i>` for the i-th operator, unless its type is empty or
///   "Unknown". The label lists the operator type and its attributes.
/// - An edge from the producer of each input value to its consumer. The
///   producer of a value is the last node which lists it as an output. Inputs
///   with no producer are drawn as dashed placeholder nodes. Edges to or from
///   operators which are not drawn are omitted.
/// - A node `out_<k>` for each of the graph's outputs, connected to the node
///   that produces it.
pub fn render_dot(graph: &Graph) -> String {
    let mut dot = String::new();

    dot.push_str("digraph ONNX_Graph {\n");
    dot.push_str("    rankdir=TB;\n");
    dot.push_str("    node [fontname=\"Helvetica\", fontsize=10];\n");
    dot.push_str("    edge [fontname=\"Helvetica\", fontsize=9];\n");
    dot.push_str(&format!("    label=\"{}\";\n", escape_dot(graph.name())));
    dot.push_str("    labelloc=\"t\";\n\n");

    dot.push_str("    // Legend\n");
    dot.push_str("    subgraph cluster_legend {\n");
    dot.push_str("        label=\"Legend\";\n");
    dot.push_str("        style=dashed;\n");
    for (id, label, op_type) in [
        ("legend_conv", "Conv", "Conv"),
        ("legend_relu", "Relu", "Relu"),
        ("legend_gemm", "Gemm/MatMul", "Gemm"),
    ] {
        dot.push_str(&format!(
            "        {} [label=\"{}\", style=filled, fillcolor={}, shape={}];\n",
            id,
            label,
            node_color(op_type),
            node_shape(op_type)
        ));
    }
    dot.push_str("    }\n\n");

    dot.push_str("    // Operators\n");
    for (i, node) in graph.nodes().iter().enumerate() {
        if !is_rendered(node) {
            continue;
        }
        dot.push_str(&format!(
            "    n{} [label=<{}>, style=filled, fillcolor={}, shape={}];\n",
            i,
            node_label(node),
            node_color(node.op_type()),
            node_shape(node.op_type())
        ));
    }

    dot.push_str("    // Edges\n");
    for (i, node) in graph.nodes().iter().enumerate() {
        if !is_rendered(node) {
            continue;
        }
        for (j, input) in node.inputs().iter().enumerate() {
            if input.is_empty() {
                continue;
            }
            if let Some(producer) = graph.producer_of(input) {
                if !is_rendered(&graph.nodes()[producer]) {
                    continue;
                }
                dot.push_str(&format!("    n{} -> n{}", producer, i));
                if input.len() < MAX_EDGE_LABEL_LEN {
                    dot.push_str(&format!(" [label=\"{}\"]", escape_dot(input)));
                }
                dot.push_str(";\n");
            } else {
                let placeholder = format!("input_{}_{}", i, j);
                dot.push_str(&format!(
                    "    {} [label=\"{}\", shape=plaintext, style=dashed];\n",
                    placeholder,
                    escape_dot(input)
                ));
                dot.push_str(&format!("    {} -> n{};\n", placeholder, i));
            }
        }
    }

    if !graph.outputs().is_empty() {
        dot.push_str("\n    // Outputs\n");
        for (k, output) in graph.outputs().iter().enumerate() {
            dot.push_str(&format!(
                "    out_{} [label=\"{}\", shape=doubleellipse, style=filled, fillcolor=gold];\n",
                k,
                escape_dot(output)
            ));
            if let Some(producer) = graph
                .producer_of(output)
                .filter(|&producer| is_rendered(&graph.nodes()[producer]))
            {
                dot.push_str(&format!("    n{} -> out_{} [style=bold];\n", producer, k));
            }
        }
    }

    dot.push_str("}\n");
    dot
}

/// Render `graph` as a DOT document and write it to `out`.
pub fn write_dot<W: Write>(graph: &Graph, mut out: W) -> std::io::Result<()> {
    out.write_all(render_dot(graph).as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use onnx_graph_testing::TestCases;

    use super::{escape_dot, escape_html, format_ints, render_dot, write_dot};
    use crate::model::{AttributeValue, Graph, Node};

    fn node(op_type: &str, inputs: &[&str], outputs: &[&str]) -> Node {
        let mut node = Node::default();
        node.set_op_type(op_type.to_string());
        for input in inputs {
            node.push_input(input.to_string());
        }
        for output in outputs {
            node.push_output(output.to_string());
        }
        node
    }

    fn sample_graph() -> Graph {
        let mut graph = Graph::default();
        graph.set_name("main".to_string());

        let mut conv = node("Conv", &["x", "w"], &["y"]);
        conv.set_attr("kernel_shape", AttributeValue::Ints(vec![3, 3]));
        conv.set_attr("pads", AttributeValue::Ints(vec![1, 1, 1, 1, 1, 1]));
        graph.push_node(conv);

        let mut relu = node("Relu", &["y", ""], &["z"]);
        relu.set_attr("alpha", AttributeValue::Float(0.5));
        relu.set_attr("mode", AttributeValue::String("fast".into()));
        graph.push_node(relu);

        graph.push_node(node("", &["z"], &["unused"]));
        graph.push_node(node("Unknown", &["z"], &["unused2"]));
        graph.push_output("z".to_string());
        graph
    }

    #[test]
    fn test_format_ints() {
        #[derive(Debug)]
        struct Case {
            values: Vec<i64>,
            expected: &'static str,
        }

        let cases = [
            Case {
                values: vec![],
                expected: "[]",
            },
            Case {
                values: vec![3, 3],
                expected: "[3,3]",
            },
            Case {
                values: vec![1, 2, 3, 4],
                expected: "[1,2,3,4]",
            },
            Case {
                values: vec![1, 2, 3, 4, 5],
                expected: "[1,2,3,4...]",
            },
            Case {
                values: vec![-1],
                expected: "[-1]",
            },
        ];

        cases.test_each(|case| {
            assert_eq!(format_ints(&case.values), case.expected);
        })
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_dot("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
        assert_eq!(escape_html("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn test_render_dot() {
        let dot = render_dot(&sample_graph());

        assert!(dot.starts_with("digraph ONNX_Graph {\n"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("    label=\"main\";\n"));
        assert!(dot.contains("subgraph cluster_legend"));

        // Operator nodes.
        assert!(dot.contains(
            "    n0 [label=<<TABLE BORDER=\"1\" CELLBORDER=\"0\" CELLSPACING=\"2\" \
             CELLPADDING=\"3\"><TR><TD BGCOLOR=\"lightblue\"><B>Conv</B></TD></TR>\
             <TR><TD>kernel_shape=[3,3]</TD></TR>\
             <TR><TD>pads=[1,1,1,1...]</TD></TR></TABLE>>, \
             style=filled, fillcolor=lightblue, shape=box];\n"
        ));
        assert!(dot.contains("<TR><TD>alpha=0.500000</TD></TR><TR><TD>mode=fast</TD></TR>"));
        assert!(dot.contains("fillcolor=lightgreen, shape=ellipse];\n"));
        assert!(!dot.contains("    n2 ["));
        assert!(!dot.contains("    n3 ["));

        // Edges and placeholders.
        assert!(dot.contains("    input_0_0 [label=\"x\", shape=plaintext, style=dashed];\n"));
        assert!(dot.contains("    input_0_0 -> n0;\n"));
        assert!(dot.contains("    input_0_1 -> n0;\n"));
        assert!(dot.contains("    n0 -> n1 [label=\"y\"];\n"));
        assert!(!dot.contains("input_1_1"));

        // Operators which are not drawn have no edges.
        assert!(!dot.contains("-> n2"));
        assert!(!dot.contains("-> n3"));
        assert!(!dot.contains("input_2_"));
        assert!(!dot.contains("input_3_"));

        // Graph outputs.
        assert!(dot.contains(
            "    out_0 [label=\"z\", shape=doubleellipse, style=filled, fillcolor=gold];\n"
        ));
        assert!(dot.contains("    n1 -> out_0 [style=bold];\n"));
    }

    #[test]
    fn test_last_producer_wins() {
        let mut graph = Graph::default();
        graph.push_node(node("Identity", &["a"], &["b"]));
        graph.push_node(node("Identity", &["a"], &["b"]));
        graph.push_node(node("Relu", &["b"], &["c"]));

        let dot = render_dot(&graph);
        assert!(dot.contains("    n1 -> n2 [label=\"b\"];\n"));
        assert!(!dot.contains("    n0 -> n2"));
    }

    #[test]
    fn test_hidden_producer_has_no_edges() {
        let mut graph = Graph::default();
        graph.push_node(node("Unknown", &["x"], &["y"]));
        graph.push_node(node("Relu", &["y"], &["z"]));
        graph.push_node(node("", &["z"], &["out"]));
        graph.push_output("y".to_string());
        graph.push_output("out".to_string());

        let dot = render_dot(&graph);
        assert!(dot.contains("    n1 [label=<"));
        assert!(!dot.contains("n0"));
        assert!(!dot.contains("n2"));
        assert!(!dot.contains("input_1_0"));
        assert!(dot.contains("    out_0 [label=\"y\""));
        assert!(!dot.contains("-> out_"));
    }

    #[test]
    fn test_long_names_are_not_labelled() {
        let long_name = "a_very_long_tensor_name_for_testing";
        let mut graph = Graph::default();
        graph.push_node(node("MatMul", &["x"], &[long_name]));
        graph.push_node(node("Add", &[long_name], &["y"]));

        let dot = render_dot(&graph);
        assert!(dot.contains("    n0 -> n1;\n"));
        assert!(dot.contains("fillcolor=lavender"));
        assert!(dot.contains("fillcolor=lightcyan"));
    }

    #[test]
    fn test_write_dot() {
        let graph = sample_graph();
        let mut buf = Vec::new();
        write_dot(&graph, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), render_dot(&graph));
    }
}
