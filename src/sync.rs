use log::debug;
use onnx_protobuf::attribute_proto::AttributeType;
use onnx_protobuf::tensor_proto::DataType;
use onnx_protobuf::{AttributeProto, GraphProto, NodeProto};
use protobuf::{Enum, EnumOrUnknown};

use crate::error::SplitError;
use crate::index::node_by_first_output;
use crate::scan::consumers_of_edge;
use crate::tensor::{unknown_shape, TRANSFER_ELEMENT_TYPE};

/// Domain of the Send/Recv/WaitEvent/RecordEvent operators.
pub const SYNC_DOMAIN: &str = "com.microsoft";

pub const RECORD_SIGNAL: &str = "record_signal";
pub const WAIT_SIGNAL: &str = "wait_signal";
pub const SEND_DST_RANK: &str = "send_dst_rank";
pub const RECV_SRC_RANK: &str = "recv_src_rank";
pub const SEND_SIGNAL: &str = "send_signal";
pub const RECV_SIGNAL: &str = "recv_signal";

const SEND_TAG: i64 = 0;
const RECV_TAG: i64 = 1;
const SEND_RECV_VERSION: i64 = 12;

/// Names introduced for one cut edge along
/// `edge -> record -> send ~ recv -> wait -> consumers`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub edge: String,
    pub send_input: String,
    pub send_output: String,
    pub recv_input: String,
    pub recv_output: String,
    pub wait_output: String,
}

impl Transfer {
    fn new(edge: &str) -> Self {
        Transfer {
            edge: edge.to_string(),
            send_input: format!("{edge}_send"),
            send_output: format!("{edge}_send_sync"),
            recv_input: format!("{edge}_recv_sync"),
            recv_output: format!("{edge}_recv"),
            wait_output: format!("{edge}_wait"),
        }
    }
}

/// The four synchronization nodes shared by every cut edge of one split,
/// addressed by their positions in the rewritten graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncBundle {
    pub send: usize,
    pub recv: usize,
    pub wait: usize,
    pub record: usize,
    pub transfers: Vec<Transfer>,
}

impl SyncBundle {
    pub fn send_node<'g>(&self, graph: &'g GraphProto) -> &'g NodeProto {
        &graph.node[self.send]
    }

    pub fn recv_node<'g>(&self, graph: &'g GraphProto) -> &'g NodeProto {
        &graph.node[self.recv]
    }

    pub fn signal_inputs() -> [(&'static str, DataType); 6] {
        [
            (RECORD_SIGNAL, DataType::INT64),
            (WAIT_SIGNAL, DataType::INT64),
            (SEND_DST_RANK, DataType::INT64),
            (RECV_SRC_RANK, DataType::INT64),
            (SEND_SIGNAL, DataType::BOOL),
            (RECV_SIGNAL, DataType::BOOL),
        ]
    }
}

/// Routes every edge in `edges` through `record -> send` on the producing
/// side and `recv -> wait` on the consuming side.
///
/// After this returns, each original edge is read only by the record node and
/// its former consumers read `<edge>_wait`.
pub fn insert_sync(graph: &mut GraphProto, edges: &[String]) -> Result<SyncBundle, SplitError> {
    for edge in edges {
        if node_by_first_output(graph, edge).is_none() {
            return Err(SplitError::unknown_edge(edge));
        }
    }

    for (name, data_type) in SyncBundle::signal_inputs() {
        graph.input.push(unknown_shape(name, data_type));
    }

    let element_types = vec![TRANSFER_ELEMENT_TYPE.value() as i64; edges.len()];

    let mut send = sync_node("Send", "send", &[SEND_SIGNAL, SEND_DST_RANK]);
    send.attribute.push(int_attr("tag", SEND_TAG));
    send.attribute.push(int_attr("version", SEND_RECV_VERSION));
    send.attribute.push(ints_attr("element_types", element_types.clone()));

    let mut recv = sync_node("Recv", "receive", &[RECV_SIGNAL, RECV_SRC_RANK]);
    recv.attribute.push(int_attr("tag", RECV_TAG));
    recv.attribute.push(int_attr("version", SEND_RECV_VERSION));
    recv.attribute.push(ints_attr("element_types", element_types));

    let mut wait = sync_node("WaitEvent", "wait", &[WAIT_SIGNAL]);
    let mut record = sync_node("RecordEvent", "record", &[RECORD_SIGNAL]);

    let mut transfers = Vec::with_capacity(edges.len());
    for edge in edges {
        let transfer = Transfer::new(edge);
        let consumers = consumers_of_edge(graph, edge);

        graph
            .output
            .push(unknown_shape(transfer.send_output.clone(), TRANSFER_ELEMENT_TYPE));
        graph
            .input
            .push(unknown_shape(transfer.recv_input.clone(), TRANSFER_ELEMENT_TYPE));

        record.input.push(edge.clone());
        record.output.push(transfer.send_input.clone());

        send.input.push(transfer.send_input.clone());
        send.output.push(transfer.send_output.clone());

        recv.input.push(transfer.recv_input.clone());
        recv.output.push(transfer.recv_output.clone());

        wait.input.push(transfer.recv_output.clone());
        wait.output.push(transfer.wait_output.clone());

        for idx in &consumers {
            for input in graph.node[*idx]
                .input
                .iter_mut()
                .filter(|input| input.as_str() == edge.as_str())
            {
                *input = transfer.wait_output.clone();
            }
        }

        debug!(
            "edge `{}` now crosses the cut; {} consumer(s) read `{}`",
            edge,
            consumers.len(),
            transfer.wait_output
        );
        transfers.push(transfer);
    }

    let base = graph.node.len();
    graph.node.push(send);
    graph.node.push(recv);
    graph.node.push(wait);
    graph.node.push(record);

    Ok(SyncBundle {
        send: base,
        recv: base + 1,
        wait: base + 2,
        record: base + 3,
        transfers,
    })
}

fn sync_node(op_type: &str, name: &str, inputs: &[&str]) -> NodeProto {
    let mut node = NodeProto::new();
    node.name = name.to_string();
    node.op_type = op_type.to_string();
    node.domain = SYNC_DOMAIN.to_string();
    node.input.extend(inputs.iter().map(|input| (*input).to_string()));
    node
}

fn int_attr(name: &str, value: i64) -> AttributeProto {
    let mut attr = AttributeProto::new();
    attr.name = name.to_string();
    attr.type_ = EnumOrUnknown::new(AttributeType::INT);
    attr.i = value;
    attr
}

fn ints_attr(name: &str, values: Vec<i64>) -> AttributeProto {
    let mut attr = AttributeProto::new();
    attr.name = name.to_string();
    attr.type_ = EnumOrUnknown::new(AttributeType::INTS);
    attr.ints = values;
    attr
}
