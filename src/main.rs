//! pipecut CLI: split an ONNX model into two pipeline stages.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use pipecut::{split_model_from_file, stage_paths, CutEdge, CutSpec};

/// Split an ONNX model into two pipeline stages joined by Send/Recv
#[derive(Parser, Debug)]
#[command(name = "pipecut")]
#[command(version)]
#[command(about = "Split an ONNX model into two pipeline stages", long_about = None)]
struct Cli {
    /// Path to the input ONNX model
    #[arg(short, long)]
    model: PathBuf,

    /// Cut specification file (.toml or .json)
    #[arg(short, long)]
    cuts: Option<PathBuf>,

    /// Inline cut edge: `EDGE` or `EDGE:consumer,consumer`
    ///
    /// Consumers are named by their first output and are the ones moved to
    /// the second stage. Can be given multiple times; appended after the
    /// edges of `--cuts`.
    #[arg(long = "cut")]
    cut: Vec<String>,

    /// Directory for `<stem>_0.onnx` and `<stem>_1.onnx` (default: next to the input)
    #[arg(short, long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Opset domain stamped on both stages
    #[arg(long)]
    domain: Option<String>,

    /// Opset version stamped on both stages
    #[arg(long = "opset-version")]
    opset_version: Option<i64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut spec = match &cli.cuts {
        Some(path) => CutSpec::load(path)
            .with_context(|| format!("failed to load cut specification {}", path.display()))?,
        None => CutSpec::default(),
    };
    for text in &cli.cut {
        spec.cuts.push(CutEdge::parse(text)?);
    }
    if spec.cuts.is_empty() {
        bail!("no cut edges given; pass --cuts FILE or --cut EDGE");
    }
    if let Some(domain) = cli.domain {
        spec.emit.domain = domain;
    }
    if let Some(version) = cli.opset_version {
        spec.emit.version = version;
    }

    let result = split_model_from_file(&cli.model, &spec)
        .with_context(|| format!("failed to split {}", cli.model.display()))?;

    let paths = stage_paths(&cli.model, cli.out_dir.as_deref());
    result.write(&paths).context("failed to write stage models")?;

    for (idx, (stage, path)) in result.stages.iter().zip(&paths).enumerate() {
        info!(
            "stage {}: {} node(s) -> {} [{}]",
            idx,
            stage.partition.len(),
            path.display(),
            stage.fingerprint
        );
    }

    Ok(())
}
