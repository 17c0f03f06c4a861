#![allow(dead_code)]

use std::sync::Arc;

use pipegraph::engine::{EngineHandle, EngineOptions, PipelineRunState, spawn_engine};
use pipegraph::graph::GraphStore;
use pipegraph::store::QueryExecutor;
use pipegraph_test_utils::fake_store::FakeStore;
use serde_json::Value;

pub use pipegraph_test_utils::{init_tracing, rows, with_timeout};

/// Start an engine over `graph` that queries `store` (a clone is handed to
/// the engine; the caller keeps `store` for assertions).
pub fn spawn_with_store(graph: GraphStore, store: &FakeStore) -> EngineHandle {
    let executor = QueryExecutor::new(Arc::new(store.clone()));
    spawn_engine(graph, executor, EngineOptions::default())
}

/// Wait until the published run state has settled with a result.
pub async fn settled_state(engine: &EngineHandle) -> PipelineRunState {
    let mut rx = engine.subscribe_run_state();
    let state = rx
        .wait_for(|s| !s.loading && (s.last_result.is_some() || s.error.is_some()))
        .await
        .expect("engine stopped before the run settled");
    state.clone()
}

/// Payload of node `id` in the engine's current graph.
pub async fn node_data(engine: &EngineHandle, id: &str) -> Value {
    engine
        .snapshot()
        .await
        .expect("engine should be running")
        .node(id)
        .unwrap_or_else(|| panic!("node {id} missing"))
        .data()
        .to_value()
}
