use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("ONNX model is missing a graph section")]
    MissingGraph,

    #[error("Cut edge `{0}` has no producing node")]
    UnknownEdge(String),

    #[error("Cut edge `{0}` has no consuming nodes")]
    NoConsumers(String),

    #[error("Node `{consumer}` does not consume cut edge `{edge}`")]
    UnknownConsumer { edge: String, consumer: String },

    #[error("Cut edge `{0}` is listed more than once")]
    DuplicateCut(String),

    #[error("Edge `{0}` is produced by more than one node")]
    DuplicateProducer(String),

    #[error("Cut does not separate the graph: `{send}` and `{recv}` are still connected")]
    CutDoesNotSeparate { send: String, recv: String },

    #[error("Pruning left the stages inconsistent: {} failed deletion(s)", .0.len())]
    IncompleteDeletion(Vec<DeletionFailure>),

    #[error("Stage graphs do not partition the rewritten graph: {0}")]
    Conservation(String),

    #[error("Invalid cut specification: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protobuf error: {0}")]
    Protobuf(#[from] protobuf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SplitError {
    pub(crate) fn conservation(msg: impl Into<String>) -> Self {
        SplitError::Conservation(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SplitError::Config(msg.into())
    }

    pub(crate) fn unknown_edge(name: impl Into<String>) -> Self {
        SplitError::UnknownEdge(name.into())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Node,
    Input,
    Output,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Node => write!(f, "node"),
            ElementKind::Input => write!(f, "input"),
            ElementKind::Output => write!(f, "output"),
        }
    }
}

/// A single element the pruning pass could not remove from a stage copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionFailure {
    pub stage: usize,
    pub kind: ElementKind,
    pub index: usize,
    pub len: usize,
}

impl fmt::Display for DeletionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage {} {} #{} out of range (len {})",
            self.stage, self.kind, self.index, self.len
        )
    }
}
