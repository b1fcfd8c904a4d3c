use std::path::Path;

use log::info;
use onnx_protobuf::{GraphProto, ModelProto, NodeProto};
use protobuf::MessageField;

use crate::cut::CutSpec;
use crate::emit::{encode_model, load_model, load_model_from_bytes, write_all};
use crate::error::SplitError;
use crate::fingerprint::Fingerprint;
use crate::identity::disambiguate;
use crate::index::GraphIndex;
use crate::partition::partition;
use crate::sync::{insert_sync, SyncBundle};

#[derive(Debug)]
pub struct SplitResult {
    /// The input model after identity and synchronization insertion.
    pub rewritten: ModelProto,
    pub bundle: SyncBundle,
    pub stages: [Stage; 2],
}

#[derive(Debug)]
pub struct Stage {
    pub model: ModelProto,
    pub partition: GraphPartition,
    pub fingerprint: Fingerprint,
}

impl Stage {
    fn new(model: ModelProto) -> Self {
        let partition = model
            .graph
            .as_ref()
            .map(GraphPartition::from_graph)
            .unwrap_or_else(|| GraphPartition::new(Vec::new()));
        let fingerprint = Fingerprint::of_model(&model);
        Stage {
            model,
            partition,
            fingerprint,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphPartition {
    pub operations: Vec<OperationSummary>,
    pub node_names: Vec<String>,
}

impl GraphPartition {
    fn new(operations: Vec<OperationSummary>) -> Self {
        let node_names = operations.iter().map(|op| op.name.clone()).collect();
        GraphPartition {
            operations,
            node_names,
        }
    }

    fn from_graph(graph: &GraphProto) -> Self {
        let operations = graph
            .node
            .iter()
            .enumerate()
            .map(|(idx, node)| OperationSummary::from_node(idx, node))
            .collect();
        GraphPartition::new(operations)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn contains(&self, node_name: &str) -> bool {
        self.node_names.iter().any(|name| name == node_name)
    }
}

#[derive(Debug, Clone)]
pub struct OperationSummary {
    pub index: usize,
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl OperationSummary {
    fn from_node(index: usize, node: &NodeProto) -> Self {
        OperationSummary {
            index,
            name: node.name.clone(),
            op_type: node.op_type.clone(),
            inputs: node.input.clone(),
            outputs: node.output.clone(),
        }
    }
}

impl SplitResult {
    pub fn write<P: AsRef<Path>>(&self, paths: &[P; 2]) -> Result<(), SplitError> {
        let encoded = [
            encode_model(&self.stages[0].model)?,
            encode_model(&self.stages[1].model)?,
        ];
        write_all(&[
            (paths[0].as_ref(), encoded[0].as_slice()),
            (paths[1].as_ref(), encoded[1].as_slice()),
        ])
    }
}

pub fn split_model_from_file<P: AsRef<Path>>(
    path: P,
    spec: &CutSpec,
) -> Result<SplitResult, SplitError> {
    split_model(load_model(path)?, spec)
}

pub fn split_model_from_bytes(bytes: &[u8], spec: &CutSpec) -> Result<SplitResult, SplitError> {
    split_model(load_model_from_bytes(bytes)?, spec)
}

/// Disambiguates fan-out cuts, inserts the synchronization bundle and splits
/// the model into two stages.
pub fn split_model(mut model: ModelProto, spec: &CutSpec) -> Result<SplitResult, SplitError> {
    let graph = model.graph.as_mut().ok_or(SplitError::MissingGraph)?;
    spec.validate(graph)?;
    info!("input graph has {} node(s)", graph.node.len());

    let mut split_edges = Vec::with_capacity(spec.cuts.len());
    let mut identity_count = 0usize;
    for cut in &spec.cuts {
        if cut.far_consumers().is_some() {
            let name = fresh_edge_name(graph, &mut identity_count)?;
            split_edges.push(disambiguate(graph, cut, &name)?);
        } else {
            split_edges.push(cut.edge.clone());
        }
    }

    let bundle = insert_sync(graph, &split_edges)?;
    let (graph0, graph1) = partition(graph, &bundle)?;

    let stage_model = |graph: GraphProto| {
        let mut stage = model.clone();
        stage.graph = MessageField::some(graph);
        spec.emit.apply(&mut stage);
        Stage::new(stage)
    };
    let stages = [stage_model(graph0), stage_model(graph1)];

    info!(
        "split into stages of {} and {} node(s)",
        stages[0].partition.len(),
        stages[1].partition.len()
    );

    Ok(SplitResult {
        rewritten: model,
        bundle,
        stages,
    })
}

fn fresh_edge_name(graph: &GraphProto, counter: &mut usize) -> Result<String, SplitError> {
    let index = GraphIndex::build(graph)?;
    loop {
        let name = format!("identity_output_{}", *counter);
        *counter += 1;
        if index.producer_of(&name).is_none()
            && index.consumers_of(&name).is_empty()
            && index.input_position(&name).is_none()
        {
            return Ok(name);
        }
    }
}
