use blake3::Hasher;
use onnx_protobuf::{AttributeProto, GraphProto, ModelProto, NodeProto, ValueInfoProto};
use std::fmt;

use crate::tensor::TensorMetadata;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn from_hasher(hasher: Hasher) -> Self {
        Fingerprint(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    /// Structural digest of a model: opset table, graph inputs/outputs and
    /// nodes in order. Weights are not hashed.
    pub fn of_model(model: &ModelProto) -> Self {
        let mut builder = FingerprintBuilder::new(b"model");
        builder.update_u64(model.opset_import.len() as u64);
        for opset in &model.opset_import {
            builder.update_str(&opset.domain);
            builder.update_i64(opset.version);
        }
        match model.graph.as_ref() {
            Some(graph) => builder.update_graph(graph),
            None => builder.update_bytes(b"<no graph>"),
        }
        builder.finish()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub struct FingerprintBuilder {
    hasher: Hasher,
}

impl FingerprintBuilder {
    pub fn new(tag: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(tag);
        FingerprintBuilder { hasher }
    }

    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn update_str(&mut self, value: &str) {
        self.update_u64(value.len() as u64);
        self.update_bytes(value.as_bytes());
    }

    pub fn update_u64(&mut self, value: u64) {
        self.update_bytes(&value.to_le_bytes());
    }

    pub fn update_i64(&mut self, value: i64) {
        self.update_u64(value as u64);
    }

    pub fn update_strs(&mut self, values: &[String]) {
        self.update_u64(values.len() as u64);
        for value in values {
            self.update_str(value);
        }
    }

    fn update_graph(&mut self, graph: &GraphProto) {
        self.update_values(&graph.input);
        self.update_values(&graph.output);
        self.update_u64(graph.node.len() as u64);
        for node in &graph.node {
            self.update_node(node);
        }
    }

    fn update_values(&mut self, values: &[ValueInfoProto]) {
        self.update_u64(values.len() as u64);
        for value in values {
            let metadata = TensorMetadata::from_value_info(value);
            self.update_str(&metadata.name);
            self.update_u64(metadata.data_type.map_or(0, |dt| dt as u64));
        }
    }

    fn update_node(&mut self, node: &NodeProto) {
        self.update_str(&node.name);
        self.update_str(&node.op_type);
        self.update_str(&node.domain);
        self.update_strs(&node.input);
        self.update_strs(&node.output);

        let mut attributes: Vec<&AttributeProto> = node.attribute.iter().collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        self.update_u64(attributes.len() as u64);
        for attr in attributes {
            self.update_str(&attr.name);
            self.update_i64(attr.i);
            self.update_u64(attr.ints.len() as u64);
            for v in &attr.ints {
                self.update_i64(*v);
            }
            self.update_bytes(&attr.f.to_le_bytes());
            self.update_u64(attr.s.len() as u64);
            self.update_bytes(&attr.s);
        }
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint::from_hasher(self.hasher)
    }
}
