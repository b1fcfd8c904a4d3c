#![allow(dead_code)]

use onnx_protobuf::attribute_proto::AttributeType;
use onnx_protobuf::{
    tensor_proto, type_proto, AttributeProto, GraphProto, ModelProto, NodeProto,
    OperatorSetIdProto, TensorProto, TypeProto, ValueInfoProto,
};
use protobuf::{Enum, EnumOrUnknown, MessageField};

pub fn make_node(name: &str, op_type: &str, inputs: &[&str], outputs: &[&str]) -> NodeProto {
    let mut node = NodeProto::new();
    node.name = name.to_string();
    node.op_type = op_type.to_string();
    for input in inputs {
        node.input.push((*input).to_string());
    }
    for output in outputs {
        node.output.push((*output).to_string());
    }
    node
}

pub fn make_value_info(name: &str) -> ValueInfoProto {
    let mut value = ValueInfoProto::new();
    value.name = name.to_string();

    let mut tensor_type = type_proto::Tensor::new();
    tensor_type.elem_type = tensor_proto::DataType::FLOAT.value();

    let mut type_proto = TypeProto::new();
    type_proto.set_tensor_type(tensor_type);
    value.type_ = MessageField::some(type_proto);

    value
}

pub fn make_graph_attr(name: &str, body: GraphProto) -> AttributeProto {
    let mut attr = AttributeProto::new();
    attr.name = name.to_string();
    attr.type_ = EnumOrUnknown::new(AttributeType::GRAPH);
    attr.g = MessageField::some(body);
    attr
}

pub fn make_scalar_tensor(name: &str, value: f32) -> TensorProto {
    let mut tensor = TensorProto::new();
    tensor.name = name.to_string();
    tensor.data_type = tensor_proto::DataType::FLOAT.value();
    tensor.dims.push(1);
    tensor.float_data.push(value);
    tensor
}

pub fn make_model(graph: GraphProto) -> ModelProto {
    let mut model = ModelProto::new();
    model.ir_version = 7;

    let mut opset = OperatorSetIdProto::new();
    opset.version = 13;
    model.opset_import.push(opset);

    model.graph = MessageField::some(graph);
    model
}

/// `x -> A -> e1 -> B -> b -> C -> y`
pub fn chain_graph() -> GraphProto {
    let mut graph = GraphProto::new();
    graph.name = "chain".to_string();
    graph.input.push(make_value_info("x"));
    graph.output.push(make_value_info("y"));
    graph.node.push(make_node("A", "Relu", &["x"], &["e1"]));
    graph.node.push(make_node("B", "Relu", &["e1"], &["b"]));
    graph.node.push(make_node("C", "Relu", &["b"], &["y"]));
    graph
}

/// `x -> D -> e2`, with `e2` read by both `E` (-> out_e) and `F` (-> out_f).
pub fn fan_out_graph() -> GraphProto {
    let mut graph = GraphProto::new();
    graph.name = "fan_out".to_string();
    graph.input.push(make_value_info("x"));
    graph.output.push(make_value_info("out_e"));
    graph.output.push(make_value_info("out_f"));
    graph.node.push(make_node("D", "Relu", &["x"], &["e2"]));
    graph.node.push(make_node("E", "Sigmoid", &["e2"], &["out_e"]));
    graph.node.push(make_node("F", "Tanh", &["e2"], &["out_f"]));
    graph
}

pub fn node_names(graph: &GraphProto) -> Vec<&str> {
    let mut names: Vec<&str> = graph.node.iter().map(|node| node.name.as_str()).collect();
    names.sort();
    names
}

pub fn input_names(graph: &GraphProto) -> Vec<&str> {
    let mut names: Vec<&str> = graph.input.iter().map(|value| value.name.as_str()).collect();
    names.sort();
    names
}

pub fn output_names(graph: &GraphProto) -> Vec<&str> {
    let mut names: Vec<&str> = graph.output.iter().map(|value| value.name.as_str()).collect();
    names.sort();
    names
}

pub fn node<'g>(graph: &'g GraphProto, name: &str) -> &'g NodeProto {
    graph
        .node
        .iter()
        .find(|node| node.name == name)
        .unwrap_or_else(|| panic!("node `{name}` present"))
}
