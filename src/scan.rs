use std::collections::HashSet;

use onnx_protobuf::{GraphProto, NodeProto};

use crate::index::GraphIndex;

/// Nodes and graph-level values adjacent to one node.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Neighbors {
    pub nodes: Vec<usize>,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

/// Every node reading `edge`, found by a scan of the node list.
pub fn consumers_of_edge(graph: &GraphProto, edge: &str) -> Vec<usize> {
    graph
        .node
        .iter()
        .enumerate()
        .filter(|(_, node)| node.input.iter().any(|input| input == edge))
        .map(|(idx, _)| idx)
        .collect()
}

/// Outer-scope names a node reads: its inputs plus whatever the bodies of
/// its graph attributes (`If`, `Loop`, `Scan`) capture.
pub fn reads(node: &NodeProto) -> Vec<String> {
    let mut names: Vec<String> = node
        .input
        .iter()
        .filter(|name| !name.is_empty())
        .cloned()
        .collect();
    for attr in &node.attribute {
        for body in attr.g.as_ref().into_iter().chain(attr.graphs.iter()) {
            names.extend(captured(body));
        }
    }
    names
}

/// Names a subgraph reads that it does not define itself.
pub fn captured(body: &GraphProto) -> Vec<String> {
    let mut defined: HashSet<&str> = body
        .input
        .iter()
        .map(|value| value.name.as_str())
        .chain(body.initializer.iter().map(|tensor| tensor.name.as_str()))
        .collect();
    for node in &body.node {
        defined.extend(node.output.iter().map(String::as_str));
    }

    let mut seen = HashSet::new();
    body.node
        .iter()
        .flat_map(reads)
        .filter(|name| !defined.contains(name.as_str()) && seen.insert(name.clone()))
        .collect()
}

/// Producers of what the node reads, and the graph inputs among them.
pub fn upstream(index: &GraphIndex, node: &NodeProto) -> Neighbors {
    let mut neighbors = Neighbors::default();
    for input in reads(node) {
        if let Some(producer) = index.producer_of(&input) {
            neighbors.nodes.push(producer);
        }
        if let Some(position) = index.input_position(&input) {
            neighbors.inputs.push(position);
        }
    }
    neighbors
}

/// Consumers of the node's outputs, and the graph outputs it feeds directly.
pub fn downstream(index: &GraphIndex, node: &NodeProto) -> Neighbors {
    let mut neighbors = Neighbors::default();
    for output in node.output.iter().filter(|name| !name.is_empty()) {
        neighbors.nodes.extend_from_slice(index.consumers_of(output));
        if let Some(position) = index.output_position(output) {
            neighbors.outputs.push(position);
        }
    }
    neighbors
}

/// Undirected adjacency: upstream and downstream combined.
pub fn connected(index: &GraphIndex, node: &NodeProto) -> Neighbors {
    let mut neighbors = upstream(index, node);
    let below = downstream(index, node);
    neighbors.nodes.extend(below.nodes);
    neighbors.outputs = below.outputs;
    neighbors
}
