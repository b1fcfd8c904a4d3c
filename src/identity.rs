use log::debug;
use onnx_protobuf::{GraphProto, NodeProto};

use crate::cut::CutEdge;
use crate::error::SplitError;
use crate::index::node_by_first_output;
use crate::scan::consumers_of_edge;

/// Inserts `Identity(edge) -> new_edge` and moves the far-stage consumers of
/// `edge` onto `new_edge`. Consumers not named in the cut keep reading `edge`.
pub fn disambiguate(
    graph: &mut GraphProto,
    cut: &CutEdge,
    new_edge: &str,
) -> Result<String, SplitError> {
    let edge = cut.edge.as_str();
    if node_by_first_output(graph, edge).is_none() {
        return Err(SplitError::unknown_edge(edge));
    }

    let consumers = consumers_of_edge(graph, edge);
    if consumers.is_empty() {
        return Err(SplitError::NoConsumers(edge.to_string()));
    }

    let far = cut.far_consumers();
    let mut moved = 0usize;
    for idx in consumers {
        let node = &mut graph.node[idx];
        let is_far = node
            .output
            .first()
            .is_some_and(|first| far.is_some_and(|set| set.contains(first)));
        if !is_far {
            continue;
        }
        for input in node.input.iter_mut().filter(|input| input.as_str() == edge) {
            *input = new_edge.to_string();
        }
        moved += 1;
    }

    let mut identity = NodeProto::new();
    identity.name = new_edge.to_string();
    identity.op_type = "Identity".to_string();
    identity.input.push(edge.to_string());
    identity.output.push(new_edge.to_string());
    graph.node.push(identity);

    debug!(
        "identity `{}` splits edge `{}`: {} consumer(s) moved",
        new_edge, edge, moved
    );

    Ok(new_edge.to_string())
}
