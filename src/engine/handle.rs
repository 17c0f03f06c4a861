// src/engine/handle.rs

//! Public entry point for driving a running engine.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::error;

use crate::errors::{PipegraphError, Result};
use crate::graph::{GraphStore, NodeId, Position};
use crate::pipeline::QuerySpecification;
use crate::store::QueryExecutor;
use crate::types::NodeKind;

use super::core::CoreEngine;
use super::runtime::{EngineRequest, Runtime};
use super::{EngineOptions, PipelineRunState, RunOutcome};

const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Start an engine over `graph` on the current Tokio runtime.
///
/// The engine task lives until [`EngineHandle::shutdown`] is called or the
/// last handle is dropped.
pub fn spawn_engine(
    graph: GraphStore,
    executor: QueryExecutor,
    options: EngineOptions,
) -> EngineHandle {
    let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    let (run_state_tx, run_state_rx) = watch::channel(PipelineRunState::default());

    let runtime = Runtime::new(
        CoreEngine::new(graph, options),
        requests_rx,
        executor,
        run_state_tx,
    );
    tokio::spawn(async move {
        if let Err(err) = runtime.run().await {
            error!(error = %err, "pipeline engine stopped with an error");
        }
    });

    EngineHandle {
        requests: requests_tx,
        run_state: run_state_rx,
    }
}

/// Cloneable handle to a running engine.
///
/// Every edit is applied in order by the engine task. Query failures are
/// never returned as `Err`; they show up in the [`RunOutcome`] of a manual
/// trigger and in [`PipelineRunState::error`]. `Err` means either the edit
/// itself was invalid or the engine is gone.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    requests: mpsc::Sender<EngineRequest>,
    run_state: watch::Receiver<PipelineRunState>,
}

impl EngineHandle {
    pub async fn add_node(&self, kind: NodeKind, position: Option<Position>) -> Result<NodeId> {
        self.request(|reply| EngineRequest::AddNode {
            kind,
            position,
            reply,
        })
        .await
    }

    /// Returns `false` when no node had that id.
    pub async fn delete_node(&self, id: &str) -> Result<bool> {
        self.request(|reply| EngineRequest::DeleteNode {
            id: id.to_string(),
            reply,
        })
        .await
    }

    /// Returns `false` when the edge already existed.
    pub async fn connect(&self, source: &str, target: &str) -> Result<bool> {
        self.request(|reply| EngineRequest::Connect {
            source: source.to_string(),
            target: target.to_string(),
            reply,
        })
        .await?
    }

    /// Returns `false` when no node had that id.
    pub async fn update_node_data(&self, id: &str, patch: Value) -> Result<bool> {
        self.request(|reply| EngineRequest::UpdateNodeData {
            id: id.to_string(),
            patch,
            reply,
        })
        .await?
    }

    /// Run the current specification immediately and wait for it to settle.
    pub async fn trigger_pipeline_query(&self) -> Result<RunOutcome> {
        self.request(|reply| EngineRequest::TriggerQuery { reply })
            .await
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.request(|reply| EngineRequest::ClearAll { reply }).await
    }

    pub async fn collect_pipeline_config(&self) -> Result<QuerySpecification> {
        self.request(|reply| EngineRequest::CollectConfig { reply })
            .await
    }

    /// Owned copy of the current nodes and edges.
    pub async fn snapshot(&self) -> Result<GraphStore> {
        self.request(|reply| EngineRequest::Snapshot { reply }).await
    }

    /// Latest published run state.
    pub fn run_state(&self) -> PipelineRunState {
        self.run_state.borrow().clone()
    }

    pub fn subscribe_run_state(&self) -> watch::Receiver<PipelineRunState> {
        self.run_state.clone()
    }

    /// Stop the engine and wait for it to exit. Calling this on an engine
    /// that already stopped is not an error.
    pub async fn shutdown(&self) -> Result<()> {
        match self
            .request(|reply| EngineRequest::Shutdown { reply })
            .await
        {
            Ok(()) | Err(PipegraphError::EngineStopped) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineRequest,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .await
            .map_err(|_| PipegraphError::EngineStopped)?;
        response.await.map_err(|_| PipegraphError::EngineStopped)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::store::{MemoryTable, Row};

    fn executor() -> QueryExecutor {
        let rows: Vec<Row> = serde_json::from_value(json!([
            { "state": "Goa", "age_0_5": 4, "age_5_18": 6, "age_18_plus": 10 },
            { "state": "Kerala", "age_0_5": 1, "age_5_18": 1, "age_18_plus": 1 },
        ]))
        .unwrap();
        QueryExecutor::new(Arc::new(MemoryTable::new("enrollments", rows)))
    }

    #[tokio::test]
    async fn manual_trigger_runs_and_publishes() {
        let engine = spawn_engine(GraphStore::new(), executor(), EngineOptions::default());
        let src = engine.add_node(NodeKind::Source, None).await.unwrap();
        let region = engine.add_node(NodeKind::RegionFilter, None).await.unwrap();
        assert!(engine.connect(&src, &region).await.unwrap());
        engine
            .update_node_data(&region, json!({ "state": "Goa" }))
            .await
            .unwrap();

        let outcome = engine.trigger_pipeline_query().await.unwrap();
        let result = outcome.result().expect("run should complete");
        assert_eq!(result.rows.len(), 1);

        let state = engine.run_state();
        assert!(!state.loading);
        assert_eq!(state.last_result.as_ref(), Some(result));

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn calls_after_shutdown_report_engine_stopped() {
        let engine = spawn_engine(GraphStore::new(), executor(), EngineOptions::default());
        engine.shutdown().await.unwrap();

        let err = engine.add_node(NodeKind::Visualizer, None).await.unwrap_err();
        assert!(matches!(err, PipegraphError::EngineStopped));
        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_edits_are_rejected() {
        let engine = spawn_engine(GraphStore::new(), executor(), EngineOptions::default());
        let viz = engine.add_node(NodeKind::Visualizer, None).await.unwrap();

        let err = engine.connect(&viz, "nowhere").await.unwrap_err();
        assert!(matches!(err, PipegraphError::NodeNotFound(id) if id == "nowhere"));

        let err = engine.update_node_data(&viz, json!(42)).await.unwrap_err();
        assert!(matches!(err, PipegraphError::InvalidPatch { .. }));
    }
}
