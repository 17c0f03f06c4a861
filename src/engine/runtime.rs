// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::Result;
use crate::graph::{GraphStore, NodeId, Position};
use crate::pipeline::QuerySpecification;
use crate::store::QueryExecutor;
use crate::types::NodeKind;

use super::core::{CoreEngine, CoreStep, TriggerStart};
use super::scheduler::TimerKind;
use super::{EngineCommand, EngineEvent, PipelineRunState, RunOutcome};

/// Capacity of the internal timer/query event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A call made through an [`EngineHandle`](super::EngineHandle), carrying the
/// channel its answer goes back on.
#[derive(Debug)]
pub enum EngineRequest {
    AddNode {
        kind: NodeKind,
        position: Option<Position>,
        reply: oneshot::Sender<NodeId>,
    },
    DeleteNode {
        id: NodeId,
        reply: oneshot::Sender<bool>,
    },
    Connect {
        source: NodeId,
        target: NodeId,
        reply: oneshot::Sender<Result<bool>>,
    },
    UpdateNodeData {
        id: NodeId,
        patch: Value,
        reply: oneshot::Sender<Result<bool>>,
    },
    TriggerQuery {
        reply: oneshot::Sender<RunOutcome>,
    },
    ClearAll {
        reply: oneshot::Sender<()>,
    },
    CollectConfig {
        reply: oneshot::Sender<QuerySpecification>,
    },
    Snapshot {
        reply: oneshot::Sender<GraphStore>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Drives a [`CoreEngine`] from handle requests, timers and query
/// completions.
///
/// This is the IO shell around the core: it owns the Tokio timers and the
/// spawned query tasks, and is the only place the graph is mutated, so edits
/// and query settlements never interleave.
pub struct Runtime {
    core: CoreEngine,
    requests: mpsc::Receiver<EngineRequest>,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: mpsc::Receiver<EngineEvent>,
    executor: QueryExecutor,
    run_state_tx: watch::Sender<PipelineRunState>,

    timers: HashMap<TimerKind, JoinHandle<()>>,
    queries: HashMap<u64, JoinHandle<()>>,
    /// Manual triggers waiting for their run to settle, keyed by sequence.
    waiters: HashMap<u64, oneshot::Sender<RunOutcome>>,
    shutdown_ack: Option<oneshot::Sender<()>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("executor", &self.executor)
            .field("in_flight", &self.queries.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreEngine,
        requests: mpsc::Receiver<EngineRequest>,
        executor: QueryExecutor,
        run_state_tx: watch::Sender<PipelineRunState>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            core,
            requests,
            events_tx,
            events_rx,
            executor,
            run_state_tx,
            timers: HashMap::new(),
            queries: HashMap::new(),
            waiters: HashMap::new(),
            shutdown_ack: None,
        }
    }

    /// Main event loop.
    ///
    /// - Applies handle requests to the core.
    /// - Feeds elapsed timers and settled queries into the core.
    /// - Publishes the run state, then executes the commands the core
    ///   returned.
    ///
    /// Exits on a shutdown request or once every handle has been dropped.
    pub async fn run(mut self) -> Result<()> {
        info!("pipeline engine started");

        loop {
            let step = tokio::select! {
                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        info!("all engine handles dropped; exiting");
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => {
                    debug!(?event, "engine received event");
                    self.core.step(event)
                }
            };

            self.publish_run_state();

            let keep_running = step.keep_running;
            for command in step.commands {
                self.execute_command(command);
            }

            if !keep_running {
                info!("core requested exit; stopping engine");
                break;
            }
        }

        self.abort_tasks();
        if let Some(ack) = self.shutdown_ack.take() {
            let _ = ack.send(());
        }
        info!("pipeline engine exiting");
        Ok(())
    }

    fn handle_request(&mut self, request: EngineRequest) -> CoreStep {
        match request {
            EngineRequest::AddNode {
                kind,
                position,
                reply,
            } => {
                let (id, step) = self.core.add_node(kind, position);
                let _ = reply.send(id);
                step
            }
            EngineRequest::DeleteNode { id, reply } => {
                let (deleted, step) = self.core.delete_node(&id);
                let _ = reply.send(deleted);
                step
            }
            EngineRequest::Connect {
                source,
                target,
                reply,
            } => {
                let (added, step) = self.core.connect(&source, &target);
                let _ = reply.send(added);
                step
            }
            EngineRequest::UpdateNodeData { id, patch, reply } => {
                let (found, step) = self.core.update_node_data(&id, &patch);
                let _ = reply.send(found);
                step
            }
            EngineRequest::TriggerQuery { reply } => {
                let (start, step) = self.core.trigger_query();
                match start {
                    TriggerStart::Dispatched(sequence) => {
                        self.waiters.insert(sequence, reply);
                    }
                    TriggerStart::Finished(outcome) => {
                        let _ = reply.send(outcome);
                    }
                }
                step
            }
            EngineRequest::ClearAll { reply } => {
                let step = self.core.clear_all();
                let _ = reply.send(());
                step
            }
            EngineRequest::CollectConfig { reply } => {
                let _ = reply.send(self.core.collect_pipeline_config());
                CoreStep::none()
            }
            EngineRequest::Snapshot { reply } => {
                let _ = reply.send(self.core.graph().clone());
                CoreStep::none()
            }
            EngineRequest::Shutdown { reply } => {
                self.shutdown_ack = Some(reply);
                self.core.step(EngineEvent::ShutdownRequested)
            }
        }
    }

    fn execute_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::ArmTimer {
                timer,
                ticket,
                delay,
            } => {
                let tx = self.events_tx.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(EngineEvent::TimerElapsed { timer, ticket }).await;
                });
                if let Some(previous) = self.timers.insert(timer, handle) {
                    previous.abort();
                }
            }
            EngineCommand::CancelTimer { timer } => {
                if let Some(handle) = self.timers.remove(&timer) {
                    debug!(?timer, "timer cancelled");
                    handle.abort();
                }
            }
            EngineCommand::ExecuteQuery { sequence, spec } => {
                let tx = self.events_tx.clone();
                let executor = self.executor.clone();
                let handle = tokio::spawn(async move {
                    let outcome = executor.execute(sequence, &spec).await;
                    let _ = tx.send(EngineEvent::QuerySettled { sequence, outcome }).await;
                });
                self.queries.insert(sequence, handle);
            }
            EngineCommand::ResolveRun { sequence, outcome } => {
                self.queries.remove(&sequence);
                if let Some(waiter) = self.waiters.remove(&sequence) {
                    let _ = waiter.send(outcome);
                }
            }
            EngineCommand::Exit => {
                debug!("core issued Exit command");
            }
        }
    }

    fn publish_run_state(&self) {
        let state = self.core.run_state();
        self.run_state_tx.send_if_modified(|current| {
            if current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
    }

    fn abort_tasks(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        for (sequence, handle) in self.queries.drain() {
            debug!(sequence, "aborting in-flight query");
            handle.abort();
        }
        self.waiters.clear();
    }
}
