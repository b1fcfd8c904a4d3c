use std::collections::{BTreeSet, HashSet};

use log::{debug, warn};
use onnx_protobuf::GraphProto;

use crate::error::{DeletionFailure, ElementKind, SplitError};
use crate::index::GraphIndex;
use crate::scan::{connected, reads};
use crate::sync::SyncBundle;

/// Nodes, graph inputs and graph outputs reachable from one seed node,
/// as positions in the graph that was searched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Component {
    pub nodes: BTreeSet<usize>,
    pub inputs: BTreeSet<usize>,
    pub outputs: BTreeSet<usize>,
}

/// Undirected search over nodes that share an edge name. Graph inputs and
/// outputs are collected but never expanded, so a graph input read on both
/// sides of the cut does not join them.
pub fn discover(graph: &GraphProto, index: &GraphIndex, seed: usize) -> Component {
    let mut component = Component::default();
    let mut stack = vec![seed];

    while let Some(idx) = stack.pop() {
        if !component.nodes.insert(idx) {
            continue;
        }
        let neighbors = connected(index, &graph.node[idx]);
        stack.extend(
            neighbors
                .nodes
                .into_iter()
                .filter(|next| !component.nodes.contains(next)),
        );
        component.inputs.extend(neighbors.inputs);
        component.outputs.extend(neighbors.outputs);
    }

    component
}

/// Positions to remove from one stage copy, highest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Deletions {
    nodes: Vec<usize>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

impl Deletions {
    fn matching<F>(graph: &GraphProto, component: &Component, mut delete: F) -> Self
    where
        F: FnMut(bool) -> bool,
    {
        let pick = |len: usize, set: &BTreeSet<usize>, delete: &mut F| -> Vec<usize> {
            (0..len).rev().filter(|idx| delete(set.contains(idx))).collect()
        };
        Deletions {
            nodes: pick(graph.node.len(), &component.nodes, &mut delete),
            inputs: pick(graph.input.len(), &component.inputs, &mut delete),
            outputs: pick(graph.output.len(), &component.outputs, &mut delete),
        }
    }
}

/// Splits the rewritten graph into the send-side stage and the receive-side
/// stage. Elements connected to neither anchor land in the receive-side stage.
pub fn partition(
    graph: &GraphProto,
    bundle: &SyncBundle,
) -> Result<(GraphProto, GraphProto), SplitError> {
    let index = GraphIndex::build(graph)?;

    let send_side = discover(graph, &index, bundle.send);
    let recv_side = discover(graph, &index, bundle.recv);

    if send_side.nodes.contains(&bundle.recv) || !send_side.nodes.is_disjoint(&recv_side.nodes) {
        return Err(SplitError::CutDoesNotSeparate {
            send: bundle.send_node(graph).name.clone(),
            recv: bundle.recv_node(graph).name.clone(),
        });
    }

    report_unanchored(graph, &send_side, &recv_side);
    report_shared_inputs(graph, &index, &send_side, &recv_side);

    // Both plans are taken from the unpruned graph before either copy changes.
    let keep_send = Deletions::matching(graph, &send_side, |in_send| !in_send);
    let keep_recv = Deletions::matching(graph, &send_side, |in_send| in_send);

    let mut stage0 = graph.clone();
    let mut stage1 = graph.clone();

    let mut failures = prune(0, &mut stage0, &keep_send);
    failures.extend(prune(1, &mut stage1, &keep_recv));
    if !failures.is_empty() {
        return Err(SplitError::IncompleteDeletion(failures));
    }

    retain_referenced(&mut stage0);
    retain_referenced(&mut stage1);

    check_conservation(graph, &stage0, &stage1)?;

    debug!(
        "stage 0: {} node(s), stage 1: {} node(s)",
        stage0.node.len(),
        stage1.node.len()
    );

    Ok((stage0, stage1))
}

fn prune(stage: usize, graph: &mut GraphProto, plan: &Deletions) -> Vec<DeletionFailure> {
    let mut failures = Vec::new();
    remove_descending(stage, ElementKind::Node, &mut graph.node, &plan.nodes, &mut failures);
    remove_descending(stage, ElementKind::Input, &mut graph.input, &plan.inputs, &mut failures);
    remove_descending(
        stage,
        ElementKind::Output,
        &mut graph.output,
        &plan.outputs,
        &mut failures,
    );
    failures
}

fn remove_descending<T>(
    stage: usize,
    kind: ElementKind,
    items: &mut Vec<T>,
    positions: &[usize],
    failures: &mut Vec<DeletionFailure>,
) {
    for &index in positions {
        if index < items.len() {
            items.remove(index);
        } else {
            failures.push(DeletionFailure {
                stage,
                kind,
                index,
                len: items.len(),
            });
        }
    }
}

/// Drops initializers and value_info entries no node of the stage touches,
/// counting names captured by subgraph bodies as read.
fn retain_referenced(graph: &mut GraphProto) {
    let mut read: HashSet<String> = HashSet::new();
    let mut touched: HashSet<String> = HashSet::new();
    for node in &graph.node {
        let names = reads(node);
        touched.extend(names.iter().cloned());
        touched.extend(node.output.iter().cloned());
        read.extend(names);
    }

    graph.initializer.retain(|tensor| read.contains(&tensor.name));
    graph.value_info.retain(|value| touched.contains(&value.name));
}

fn check_conservation(
    graph: &GraphProto,
    stage0: &GraphProto,
    stage1: &GraphProto,
) -> Result<(), SplitError> {
    let counts = [
        ("node", graph.node.len(), stage0.node.len(), stage1.node.len()),
        ("input", graph.input.len(), stage0.input.len(), stage1.input.len()),
        ("output", graph.output.len(), stage0.output.len(), stage1.output.len()),
    ];
    for (what, total, first, second) in counts {
        if first + second != total {
            return Err(SplitError::conservation(format!(
                "{} {}(s) split into {} + {}",
                total, what, first, second
            )));
        }
    }
    Ok(())
}

fn report_unanchored(graph: &GraphProto, send_side: &Component, recv_side: &Component) {
    let stray: Vec<&str> = (0..graph.node.len())
        .filter(|idx| !send_side.nodes.contains(idx) && !recv_side.nodes.contains(idx))
        .map(|idx| graph.node[idx].name.as_str())
        .collect();
    if !stray.is_empty() {
        warn!(
            "{} node(s) reach neither synchronization anchor and go to stage 1: {:?}",
            stray.len(),
            stray
        );
    }
}

fn report_shared_inputs(
    graph: &GraphProto,
    index: &GraphIndex,
    send_side: &Component,
    recv_side: &Component,
) {
    for &position in &send_side.inputs {
        let name = graph.input[position].name.as_str();
        let read_by_recv_side = index
            .consumers_of(name)
            .iter()
            .any(|idx| recv_side.nodes.contains(idx));
        if read_by_recv_side {
            warn!(
                "graph input `{}` is read on both sides of the cut; only stage 0 declares it",
                name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use onnx_protobuf::{NodeProto, ValueInfoProto};

    use super::*;

    fn node(name: &str, inputs: &[&str], outputs: &[&str]) -> NodeProto {
        let mut node = NodeProto::new();
        node.name = name.to_string();
        node.op_type = "Relu".to_string();
        node.input = inputs.iter().map(|s| s.to_string()).collect();
        node.output = outputs.iter().map(|s| s.to_string()).collect();
        node
    }

    fn value(name: &str) -> ValueInfoProto {
        let mut value = ValueInfoProto::new();
        value.name = name.to_string();
        value
    }

    #[test]
    fn out_of_range_deletions_are_collected() {
        let mut graph = GraphProto::new();
        graph.node.push(node("a", &["x"], &["y"]));
        graph.input.push(value("x"));

        let plan = Deletions {
            nodes: vec![3, 0],
            inputs: vec![0, 0],
            outputs: vec![],
        };
        let failures = prune(1, &mut graph, &plan);

        assert!(graph.node.is_empty());
        assert!(graph.input.is_empty());
        assert_eq!(
            failures,
            vec![
                DeletionFailure {
                    stage: 1,
                    kind: ElementKind::Node,
                    index: 3,
                    len: 1,
                },
                DeletionFailure {
                    stage: 1,
                    kind: ElementKind::Input,
                    index: 0,
                    len: 0,
                },
            ]
        );
    }

    #[test]
    fn discovery_does_not_cross_shared_graph_inputs() {
        let mut graph = GraphProto::new();
        graph.input.push(value("x"));
        graph.node.push(node("left", &["x"], &["l"]));
        graph.node.push(node("right", &["x"], &["r"]));
        graph.output.push(value("l"));

        let index = GraphIndex::build(&graph).unwrap();
        let component = discover(&graph, &index, 0);

        assert_eq!(component.nodes, BTreeSet::from([0]));
        assert_eq!(component.inputs, BTreeSet::from([0]));
        assert_eq!(component.outputs, BTreeSet::from([0]));
    }

    #[test]
    fn deletion_plans_are_complementary() {
        let mut graph = GraphProto::new();
        graph.node.push(node("a", &[], &["e"]));
        graph.node.push(node("b", &["e"], &["f"]));
        graph.node.push(node("c", &[], &["g"]));
        let component = Component {
            nodes: BTreeSet::from([0, 1]),
            ..Component::default()
        };

        let keep = Deletions::matching(&graph, &component, |inside| !inside);
        let drop = Deletions::matching(&graph, &component, |inside| inside);

        assert_eq!(keep.nodes, vec![2]);
        assert_eq!(drop.nodes, vec![1, 0]);
    }
}
