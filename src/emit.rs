use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use onnx_protobuf::{ModelProto, OperatorSetIdProto};
use protobuf::Message;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::SplitError;
use crate::sync::SYNC_DOMAIN;

/// Operator-set entry stamped on each emitted stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub domain: String,
    pub version: i64,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            domain: SYNC_DOMAIN.to_string(),
            version: 1,
        }
    }
}

impl EmitOptions {
    /// Overwrites the first opset entry, adding one if the table is empty.
    pub fn apply(&self, model: &mut ModelProto) {
        if model.opset_import.is_empty() {
            model.opset_import.push(OperatorSetIdProto::new());
        }
        let opset = &mut model.opset_import[0];
        opset.domain = self.domain.clone();
        opset.version = self.version;
    }
}

pub fn load_model_from_bytes(bytes: &[u8]) -> Result<ModelProto, SplitError> {
    let model = ModelProto::parse_from_bytes(bytes)?;
    if model.graph.is_none() {
        return Err(SplitError::MissingGraph);
    }
    Ok(model)
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelProto, SplitError> {
    let bytes = fs::read(path)?;
    load_model_from_bytes(&bytes)
}

pub fn encode_model(model: &ModelProto) -> Result<Vec<u8>, SplitError> {
    Ok(model.write_to_bytes()?)
}

pub fn write_model<P: AsRef<Path>>(model: &ModelProto, path: P) -> Result<(), SplitError> {
    write_all(&[(path.as_ref(), encode_model(model)?.as_slice())])
}

/// Writes every file or none. Each file is staged in a temporary sibling and
/// renamed into place only once all of them have been written.
pub(crate) fn write_all(files: &[(&Path, &[u8])]) -> Result<(), SplitError> {
    let mut staged = Vec::with_capacity(files.len());
    for &(path, bytes) in files {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        staged.push((temp, path, bytes.len()));
    }

    let mut persisted: Vec<&Path> = Vec::with_capacity(staged.len());
    for (temp, path, len) in staged {
        if let Err(err) = temp.persist(path) {
            for done in &persisted {
                let _ = fs::remove_file(done);
            }
            return Err(err.error.into());
        }
        info!("wrote {} ({} bytes)", path.display(), len);
        persisted.push(path);
    }
    Ok(())
}

/// `<dir>/<stem>_0.onnx` and `<dir>/<stem>_1.onnx`, next to the input unless
/// `out_dir` is given.
pub fn stage_paths(input: &Path, out_dir: Option<&Path>) -> [PathBuf; 2] {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("model");
    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    [
        dir.join(format!("{stem}_0.onnx")),
        dir.join(format!("{stem}_1.onnx")),
    ]
}
