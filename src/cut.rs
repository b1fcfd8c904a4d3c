use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use onnx_protobuf::GraphProto;
use serde::{Deserialize, Serialize};

use crate::emit::EmitOptions;
use crate::error::SplitError;
use crate::index::{node_by_first_output, GraphIndex};

/// An edge to sever. `consumers` names, by their first output, the consumers
/// of the edge that belong to the second stage; every other consumer stays
/// with the producer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutEdge {
    pub edge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumers: Option<BTreeSet<String>>,
}

impl CutEdge {
    pub fn new(edge: impl Into<String>) -> Self {
        CutEdge {
            edge: edge.into(),
            consumers: None,
        }
    }

    pub fn with_consumers<I, S>(edge: impl Into<String>, consumers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CutEdge {
            edge: edge.into(),
            consumers: Some(consumers.into_iter().map(Into::into).collect()),
        }
    }

    /// Far-stage consumers, if the edge fans out across the cut.
    pub fn far_consumers(&self) -> Option<&BTreeSet<String>> {
        self.consumers.as_ref().filter(|set| !set.is_empty())
    }

    /// Parses the command-line form `EDGE` or `EDGE:consumer,consumer`.
    pub fn parse(text: &str) -> Result<Self, SplitError> {
        let (edge, consumers) = match text.split_once(':') {
            Some((edge, rest)) => (edge, Some(rest)),
            None => (text, None),
        };
        let edge = edge.trim();
        if edge.is_empty() {
            return Err(SplitError::config(format!("empty edge name in `{}`", text)));
        }
        match consumers {
            None => Ok(CutEdge::new(edge)),
            Some(list) => {
                let names: Vec<&str> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect();
                if names.is_empty() {
                    return Err(SplitError::config(format!(
                        "empty consumer list in `{}`",
                        text
                    )));
                }
                Ok(CutEdge::with_consumers(edge, names))
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutSpec {
    #[serde(rename = "cut", default)]
    pub cuts: Vec<CutEdge>,
    #[serde(default)]
    pub emit: EmitOptions,
}

impl CutSpec {
    pub fn new(cuts: Vec<CutEdge>) -> Self {
        CutSpec {
            cuts,
            emit: EmitOptions::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SplitError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SplitError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads a specification file, picking the format by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SplitError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => CutSpec::from_toml_str(&text),
            Some("json") => CutSpec::from_json_str(&text),
            _ => Err(SplitError::config(format!(
                "unrecognised cut specification format `{}` (expected .toml or .json)",
                path.display()
            ))),
        }
    }

    /// Checks every cut against the graph before anything is rewritten.
    pub fn validate(&self, graph: &GraphProto) -> Result<(), SplitError> {
        if self.cuts.is_empty() {
            return Err(SplitError::config("no cut edges given"));
        }

        let index = GraphIndex::build(graph)?;
        let mut seen = HashSet::new();

        for cut in &self.cuts {
            if !seen.insert(cut.edge.as_str()) {
                return Err(SplitError::DuplicateCut(cut.edge.clone()));
            }
            if node_by_first_output(graph, &cut.edge).is_none() {
                return Err(SplitError::unknown_edge(&cut.edge));
            }

            let consumers = index.consumers_of(&cut.edge);
            if consumers.is_empty() {
                return Err(SplitError::NoConsumers(cut.edge.clone()));
            }

            if let Some(far) = cut.far_consumers() {
                let known: HashSet<&str> = consumers
                    .iter()
                    .filter_map(|&idx| graph.node[idx].output.first())
                    .map(String::as_str)
                    .collect();
                if let Some(missing) = far.iter().find(|name| !known.contains(name.as_str())) {
                    return Err(SplitError::UnknownConsumer {
                        edge: cut.edge.clone(),
                        consumer: missing.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
