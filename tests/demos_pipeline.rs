mod common;
use crate::common::{init_tracing, node_data};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use pipegraph::cli::CliArgs;
use pipegraph::config::load_and_validate;
use pipegraph::engine::spawn_engine;
use pipegraph::store::{MemoryTable, Projection};
use pipegraph::types::FilterKey;

type TestResult = Result<(), Box<dyn Error>>;

fn demo(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(file)
}

#[test]
fn demo_config_seeds_graph_and_engine_settings() -> TestResult {
    let cfg = load_and_validate(demo("Pipeline.toml"))?;

    assert_eq!(cfg.engine.table, "enrollments");
    assert_eq!(cfg.engine.debounce, Duration::from_millis(500));
    assert_eq!(cfg.engine.connect_check, Duration::from_millis(100));
    assert_eq!(cfg.engine.row_limit, 100);
    assert_eq!(cfg.graph.nodes().len(), 6);
    assert_eq!(cfg.graph.edges().len(), 5);

    let spec = pipegraph::pipeline::collect_pipeline_config(&cfg.graph);
    assert!(spec.has_source);
    assert_eq!(spec.filters.get(&FilterKey::State).map(String::as_str), Some("Odisha"));
    assert_eq!(spec.columns, vec!["age_0_5", "age_18_plus"]);
    Ok(())
}

#[tokio::test]
async fn demo_pipeline_runs_against_demo_rows() -> TestResult {
    init_tracing();

    let cfg = load_and_validate(demo("Pipeline.toml"))?;
    let table = MemoryTable::from_json_file(&cfg.engine.table, demo("rows.json"))?;
    assert_eq!(table.len(), 4);

    let spec = pipegraph::pipeline::collect_pipeline_config(&cfg.graph);
    let executor = cfg.executor(Arc::new(table));
    let request = executor.build_request(&spec)?;
    assert_eq!(
        request.projection,
        Projection::Columns(
            ["state", "district", "pincode", "age_0_5", "age_18_plus"]
                .map(String::from)
                .to_vec()
        )
    );

    let engine = spawn_engine(cfg.graph.clone(), executor, cfg.engine_options());
    let outcome = engine.trigger_pipeline_query().await?;
    let result = outcome.result().expect("demo run should complete");
    assert_eq!(result.rows.len(), 2);
    assert!(result.rows.iter().all(|row| row["state"] == json!("Odisha")));
    assert!(result.rows.iter().all(|row| !row.contains_key("age_5_18")));

    // age_0_5 sums to 11 across the two Odisha rows.
    assert_eq!(node_data(&engine, "rule").await["signal"], json!(true));
    assert_eq!(node_data(&engine, "alert").await["signal"], json!(true));
    assert_eq!(node_data(&engine, "chart").await["filters"], json!({ "state": "Odisha" }));

    engine.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn cli_entry_point_runs_demo_and_dry_run() -> TestResult {
    let config = demo("Pipeline.toml");

    pipegraph::run(CliArgs {
        config: config.clone(),
        data: None,
        log_level: None,
        dry_run: true,
    })
    .await?;

    pipegraph::run(CliArgs {
        config,
        data: Some(demo("rows.json").to_string_lossy().into_owned()),
        log_level: None,
        dry_run: false,
    })
    .await?;
    Ok(())
}
