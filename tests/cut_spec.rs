mod common;

use std::collections::BTreeSet;
use std::fs;

use pipecut::{CutEdge, CutSpec, EmitOptions, SplitError, SYNC_DOMAIN};

use common::*;

#[test]
fn toml_spec_with_defaults() {
    let spec = CutSpec::from_toml_str(
        r#"
        [[cut]]
        edge = "186"

        [[cut]]
        edge = "71"
        consumers = ["273", "395"]
        "#,
    )
    .expect("valid toml");

    assert_eq!(
        spec.cuts,
        vec![
            CutEdge::new("186"),
            CutEdge::with_consumers("71", ["273", "395"]),
        ]
    );
    assert_eq!(spec.emit, EmitOptions::default());
    assert_eq!(spec.emit.domain, SYNC_DOMAIN);
    assert_eq!(spec.emit.version, 1);
}

#[test]
fn json_spec_with_emit_override() {
    let spec = CutSpec::from_json_str(
        r#"{
            "cut": [{ "edge": "e1" }],
            "emit": { "domain": "ai.stages", "version": 3 }
        }"#,
    )
    .expect("valid json");

    assert_eq!(spec.cuts, vec![CutEdge::new("e1")]);
    assert_eq!(spec.emit.domain, "ai.stages");
    assert_eq!(spec.emit.version, 3);
}

#[test]
fn partial_emit_section_keeps_other_default() {
    let spec = CutSpec::from_toml_str(
        r#"
        [[cut]]
        edge = "e1"

        [emit]
        version = 2
        "#,
    )
    .expect("valid toml");

    assert_eq!(spec.emit.domain, SYNC_DOMAIN);
    assert_eq!(spec.emit.version, 2);
}

#[test]
fn spec_files_are_loaded_by_extension() {
    let dir = tempfile::tempdir().expect("temp dir");

    let toml_path = dir.path().join("cuts.toml");
    fs::write(&toml_path, "[[cut]]\nedge = \"e1\"\n").expect("write toml");
    assert_eq!(
        CutSpec::load(&toml_path).expect("load toml").cuts,
        vec![CutEdge::new("e1")]
    );

    let json_path = dir.path().join("cuts.json");
    fs::write(&json_path, r#"{"cut":[{"edge":"e2","consumers":["out_f"]}]}"#)
        .expect("write json");
    assert_eq!(
        CutSpec::load(&json_path).expect("load json").cuts,
        vec![CutEdge::with_consumers("e2", ["out_f"])]
    );

    let yaml_path = dir.path().join("cuts.yaml");
    fs::write(&yaml_path, "cut: []\n").expect("write yaml");
    assert!(matches!(
        CutSpec::load(&yaml_path),
        Err(SplitError::Config(_))
    ));
}

#[test]
fn malformed_toml_is_reported() {
    let err = CutSpec::from_toml_str("[[cut]]\nedge = 3\n").unwrap_err();
    assert!(matches!(err, SplitError::Toml(_)));
}

#[test]
fn inline_cut_syntax() {
    assert_eq!(CutEdge::parse("186").unwrap(), CutEdge::new("186"));
    assert_eq!(
        CutEdge::parse("71:273, 395").unwrap(),
        CutEdge::with_consumers("71", ["273", "395"])
    );
    assert!(matches!(CutEdge::parse(":273"), Err(SplitError::Config(_))));
    assert!(matches!(CutEdge::parse("71:"), Err(SplitError::Config(_))));
}

#[test]
fn empty_consumer_set_means_whole_edge() {
    let cut = CutEdge::with_consumers("e1", Vec::<String>::new());
    assert!(cut.far_consumers().is_none());

    let cut = CutEdge::with_consumers("e2", ["out_f"]);
    assert_eq!(
        cut.far_consumers(),
        Some(&BTreeSet::from(["out_f".to_string()]))
    );
}

#[test]
fn validation_runs_against_the_graph() {
    let graph = fan_out_graph();

    assert!(CutSpec::new(vec![CutEdge::with_consumers("e2", ["out_f"])])
        .validate(&graph)
        .is_ok());
    assert!(matches!(
        CutSpec::new(vec![CutEdge::new("x")]).validate(&graph),
        Err(SplitError::UnknownEdge(_))
    ));
    assert!(matches!(
        CutSpec::new(vec![CutEdge::new("out_e")]).validate(&graph),
        Err(SplitError::NoConsumers(_))
    ));
}
