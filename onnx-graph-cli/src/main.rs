use std::collections::VecDeque;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;

use onnx_graph::{DecodeOptions, Graph, Node};
use tracing_subscriber::EnvFilter;

struct Args {
    /// Model file to load.
    model: String,

    /// Path to write a Graphviz rendering of the graph to.
    dot: Option<String>,

    /// Print the graph as JSON instead of a summary.
    json: bool,

    /// Fail if the model data is truncated.
    strict: bool,

    /// Also recognize the onnx.proto numbering of tensor and attribute fields.
    schema_fields: bool,

    /// Enable verbose logging.
    verbose: bool,
}

fn parse_args(mut parser: lexopt::Parser) -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut values = VecDeque::new();
    let mut dot = None;
    let mut json = false;
    let mut strict = false;
    let mut schema_fields = false;
    let mut verbose = false;

    while let Some(arg) = parser.next()? {
        match arg {
            Value(val) => values.push_back(val.string()?),
            Short('d') | Long("dot") => dot = Some(parser.value()?.string()?),
            Short('j') | Long("json") => json = true,
            Long("strict") => strict = true,
            Long("schema-fields") => schema_fields = true,
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!(
                    "Inspect the graph of an ONNX model.

Usage: {bin_name} [OPTIONS] <model>

  -d, --dot <path>     Write a Graphviz rendering of the graph to <path>
  -j, --json           Print the decoded graph as JSON
      --strict         Fail if the model file is truncated
      --schema-fields  Also recognize the onnx.proto tensor and attribute field numbers
  -v, --verbose        Enable verbose logging
  -h, --help           Print help

Log output can be filtered using the RUST_LOG environment variable.
",
                    bin_name = parser.bin_name().unwrap_or("onnx-graph")
                );
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let model = values.pop_front().ok_or("missing `<model>` arg")?;

    Ok(Args {
        model,
        dot,
        json,
        strict,
        schema_fields,
        verbose,
    })
}

/// Install a subscriber which writes log messages to stderr.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Format a list of value names, omitting empty names.
fn format_names(names: &[String]) -> String {
    names
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_node(node: &Node) {
    println!("Op: {}", node.op_type());
    if let Some(name) = node.name() {
        println!("  Name: {}", name);
    }
    println!("  Inputs: {}", format_names(node.inputs()));
    println!("  Outputs: {}", format_names(node.outputs()));
    for (name, values) in node.int_list_attrs() {
        println!("  {} = {:?}", name, values);
    }
    for (name, value) in node.float_attrs() {
        println!("  {} = {}", name, value);
    }
    for (name, value) in node.string_attrs() {
        println!("  {} = \"{}\"", name, value);
    }
    println!();
}

fn print_summary(graph: &Graph) {
    println!("IR version: {}", graph.format_version());
    println!("Producer: {} v{}", graph.producer_name(), graph.producer_version());
    println!("Graph name: {}", graph.name());
    println!(
        "Graph stats: {} nodes, {} initializers, {} inputs, {} outputs",
        graph.nodes().len(),
        graph.initializers().len(),
        graph.inputs().len(),
        graph.outputs().len()
    );
    println!();

    for node in graph.nodes().iter().filter(|n| !n.op_type().is_empty()) {
        print_node(node);
    }
}

/// Tool for inspecting the operators and weights in ONNX models.
///
/// ```
/// cargo run -p onnx-graph-cli -- model.onnx --dot graph.dot
/// dot -Tpng graph.dot -o graph.png
/// ```
fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args(lexopt::Parser::from_env())?;
    init_logging(args.verbose);

    let graph = DecodeOptions::default()
        .allow_truncated(!args.strict)
        .schema_fields(args.schema_fields)
        .graph_io(true)
        .load_file(&args.model)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        print_summary(&graph);
    }

    if let Some(dot_path) = args.dot {
        let file = File::create(&dot_path)?;
        onnx_graph::dot::write_dot(&graph, BufWriter::new(file))?;
        eprintln!("Wrote graph to {}", dot_path);
    }

    Ok(())
}
