use std::collections::HashMap;

use onnx_protobuf::GraphProto;

use crate::error::SplitError;
use crate::scan::reads;

/// Name-to-position lookup over one snapshot of a graph.
///
/// Positions are only meaningful for the graph the index was built from; any
/// mutation of the node, input or output lists requires a rebuild.
#[derive(Debug, Default)]
pub struct GraphIndex {
    producers: HashMap<String, usize>,
    consumers: HashMap<String, Vec<usize>>,
    inputs: HashMap<String, usize>,
    outputs: HashMap<String, usize>,
}

impl GraphIndex {
    pub fn build(graph: &GraphProto) -> Result<Self, SplitError> {
        let mut index = GraphIndex::default();

        for (idx, node) in graph.node.iter().enumerate() {
            for output in &node.output {
                if output.is_empty() {
                    continue;
                }
                if index.producers.insert(output.clone(), idx).is_some() {
                    return Err(SplitError::DuplicateProducer(output.clone()));
                }
            }
            for input in reads(node) {
                index.consumers.entry(input).or_default().push(idx);
            }
        }

        for (idx, input) in graph.input.iter().enumerate() {
            index.inputs.entry(input.name.clone()).or_insert(idx);
        }
        for (idx, output) in graph.output.iter().enumerate() {
            index.outputs.entry(output.name.clone()).or_insert(idx);
        }

        Ok(index)
    }

    /// Position of the node whose outputs include `edge`.
    pub fn producer_of(&self, edge: &str) -> Option<usize> {
        self.producers.get(edge).copied()
    }

    pub fn consumers_of(&self, edge: &str) -> &[usize] {
        self.consumers
            .get(edge)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn input_position(&self, name: &str) -> Option<usize> {
        self.inputs.get(name).copied()
    }

    pub fn output_position(&self, name: &str) -> Option<usize> {
        self.outputs.get(name).copied()
    }
}

/// Position of the node whose first output is `edge`.
pub fn node_by_first_output(graph: &GraphProto, edge: &str) -> Option<usize> {
    graph
        .node
        .iter()
        .position(|node| node.output.first().map(String::as_str) == Some(edge))
}
