use std::error::Error;
use std::fs;

use tempfile::tempdir;

use pipegraph::config::{load_and_validate, load_from_path};
use pipegraph::errors::PipegraphError;
use pipegraph::types::NodeKind;
use pipegraph_test_utils::builders::ConfigFileBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<(tempfile::TempDir, std::path::PathBuf), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("Pipeline.toml");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

#[test]
fn missing_file_is_an_io_error() -> TestResult {
    let dir = tempdir()?;
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, PipegraphError::IoError(_)));
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let (_dir, path) = write_config("[engine\ntable = ")?;
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, PipegraphError::TomlError(_)));
    Ok(())
}

#[test]
fn unknown_node_kind_is_rejected_while_parsing() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[[node]]
id = "x"
kind = "databaseSink"
"#,
    )?;
    assert!(matches!(
        load_from_path(&path).unwrap_err(),
        PipegraphError::TomlError(_)
    ));
    Ok(())
}

#[test]
fn empty_file_yields_empty_graph_with_defaults() -> TestResult {
    let (_dir, path) = write_config("")?;
    let cfg = load_and_validate(&path)?;
    assert!(cfg.graph.is_empty());
    assert_eq!(cfg.engine.row_limit, 100);
    assert_eq!(cfg.engine.table, "enrollments");
    Ok(())
}

#[test]
fn edges_to_unknown_nodes_are_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[[node]]
id = "source"
kind = "source"

[[edge]]
source = "source"
target = "ghost"
"#,
    )?;
    let err = load_and_validate(&path).unwrap_err();
    match err {
        PipegraphError::ConfigError(msg) => assert!(msg.contains("unknown node 'ghost'"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn bad_durations_and_limits_are_rejected() -> TestResult {
    for engine in [
        "debounce = \"soon\"",
        "debounce = \"0ms\"",
        "query_timeout = \"10 parsecs\"",
        "row_limit = 0",
        "table = \"  \"",
    ] {
        let (_dir, path) = write_config(&format!("[engine]\n{engine}\n"))?;
        let err = load_and_validate(&path).unwrap_err();
        assert!(
            matches!(err, PipegraphError::ConfigError(_)),
            "{engine}: unexpected error {err}"
        );
    }
    Ok(())
}

#[test]
fn data_that_does_not_fit_the_kind_is_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[[node]]
id = "rule"
kind = "logicProcessor"
data = { threshold = "high" }
"#,
    )?;
    let err = load_and_validate(&path).unwrap_err();
    match err {
        PipegraphError::ConfigError(msg) => assert!(msg.contains("invalid data"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn cycles_and_duplicate_edges_only_warn() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .node("source", NodeKind::Source)
        .node("a", NodeKind::RegionFilter)
        .node("b", NodeKind::ColumnSelector)
        .edge("source", "a")
        .edge("a", "b")
        .edge("b", "a")
        .edge("a", "b")
        .build();

    assert_eq!(cfg.graph.edges().len(), 3);
    Ok(())
}

#[test]
fn builder_settings_reach_the_engine_options() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .debounce("250ms")
        .connect_check("1s")
        .row_limit(5)
        .table("people")
        .node("source", NodeKind::Source)
        .build();

    let options = cfg.engine_options();
    assert_eq!(options.debounce.as_millis(), 250);
    assert_eq!(options.connect_check.as_secs(), 1);
    assert_eq!(cfg.engine.row_limit, 5);
    assert_eq!(
        pipegraph::pipeline::collect_pipeline_config(&cfg.graph).table,
        "people"
    );
    Ok(())
}
