// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod types;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde_json::json;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::engine::{RunOutcome, spawn_engine};
use crate::pipeline::collect_pipeline_config;
use crate::pipeline::columns::display_name;
use crate::store::MemoryTable;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and graph seeding
/// - the in-memory data store
/// - the engine, driven through one manual run
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let table = match &args.data {
        Some(path) => MemoryTable::from_json_file(&cfg.engine.table, path)?,
        None => MemoryTable::new(&cfg.engine.table, Vec::new()),
    };
    info!(table = table.name(), rows = table.len(), "data store ready");

    let executor = cfg.executor(Arc::new(table));
    let engine = spawn_engine(cfg.graph.clone(), executor, cfg.engine_options());

    let outcome = engine.trigger_pipeline_query().await?;
    println!("{outcome}");

    let snapshot = engine.snapshot().await?;
    let report = json!({
        "runState": engine.run_state(),
        "graph": snapshot,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    engine.shutdown().await?;

    match outcome {
        RunOutcome::Failed(err) => Err(anyhow!("pipeline run failed: {err}")),
        _ => Ok(()),
    }
}

/// Simple dry-run output: print nodes, edges and the derived query.
fn print_dry_run(cfg: &ConfigFile) {
    let graph = &cfg.graph;

    println!("pipegraph dry-run");
    println!("  engine.table = {}", cfg.engine.table);
    println!("  engine.debounce = {:?}", cfg.engine.debounce);
    println!("  engine.connect_check = {:?}", cfg.engine.connect_check);
    println!("  engine.row_limit = {}", cfg.engine.row_limit);
    println!("  engine.query_timeout = {:?}", cfg.engine.query_timeout);
    println!();

    println!("nodes ({}):", graph.nodes().len());
    for node in graph.nodes() {
        println!("  - {} [{}]", node.id(), node.kind());
        println!("      data: {}", node.data().to_value());
    }

    println!("edges ({}):", graph.edges().len());
    for edge in graph.edges() {
        println!("  - {} -> {}", edge.source, edge.target);
    }
    println!();

    let spec = collect_pipeline_config(graph);
    println!("query:");
    if !spec.has_source {
        println!("  (no source node; nothing would run)");
        return;
    }
    println!("  table: {}", spec.table);
    for (key, value) in &spec.filters {
        println!("  where {key} = {value}");
    }
    if spec.columns.is_empty() {
        println!("  columns: *");
    } else {
        println!("  columns:");
        for column in &spec.columns {
            println!("    - {column} ({})", display_name(column));
        }
    }
    println!("  would run on edit: {}", spec.has_constraints());

    debug!("dry-run complete (no execution)");
}
