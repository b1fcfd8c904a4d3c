//! Splits one ONNX computation graph into two pipeline stages along a set of
//! cut edges. Every cut edge is routed through `RecordEvent -> Send` on the
//! producing stage and `Recv -> WaitEvent` on the consuming stage.

mod cut;
mod emit;
mod error;
mod fingerprint;
mod identity;
mod index;
mod partition;
mod scan;
mod split;
mod sync;
mod tensor;

pub use cut::{CutEdge, CutSpec};
pub use emit::{
    encode_model, load_model, load_model_from_bytes, stage_paths, write_model, EmitOptions,
};
pub use error::{DeletionFailure, ElementKind, SplitError};
pub use fingerprint::Fingerprint;
pub use identity::disambiguate;
pub use index::GraphIndex;
pub use partition::{discover, partition, Component};
pub use scan::{consumers_of_edge, Neighbors};
pub use split::{
    split_model, split_model_from_bytes, split_model_from_file, GraphPartition,
    OperationSummary, SplitResult, Stage,
};
pub use sync::{insert_sync, SyncBundle, Transfer, SYNC_DOMAIN};
pub use tensor::TensorMetadata;
