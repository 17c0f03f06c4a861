// src/engine/core.rs

//! Pure core engine state machine.
//!
//! [`CoreEngine`] owns the graph, the run state and the scheduler. Graph
//! edits are applied synchronously through its methods; timers and query
//! responses arrive as [`EngineEvent`]s through [`CoreEngine::step`]. Every
//! call returns a [`CoreStep`] describing what the IO shell should do next
//! (arm or cancel a timer, run a query, resolve a waiter).
//!
//! No Tokio, channels or data-store access happen here, so the whole
//! debounce/stale-response logic is unit tested without a runtime.

use std::mem;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{QueryError, Result};
use crate::graph::{GraphStore, NodeId, Position};
use crate::pipeline::{QuerySpecification, collect_pipeline_config, mark_loading, propagate};
use crate::store::QueryResult;
use crate::types::NodeKind;

use super::scheduler::{Scheduler, Settlement, TimerKind};
use super::{EngineCommand, EngineEvent, EngineOptions, PipelineRunState, RunOutcome};

/// Decision returned by the core after handling a single edit or event.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<EngineCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn with(commands: Vec<EngineCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn none() -> Self {
        Self::with(Vec::new())
    }
}

/// How a manual trigger started.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerStart {
    /// A query went out as `sequence`; the outcome follows on settlement.
    Dispatched(u64),
    /// The run finished without reaching the data store.
    Finished(RunOutcome),
}

#[derive(Debug)]
pub struct CoreEngine {
    graph: GraphStore,
    scheduler: Scheduler,
    run_state: PipelineRunState,
    options: EngineOptions,
}

impl CoreEngine {
    pub fn new(graph: GraphStore, options: EngineOptions) -> Self {
        Self {
            graph,
            scheduler: Scheduler::new(),
            run_state: PipelineRunState::default(),
            options,
        }
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn run_state(&self) -> &PipelineRunState {
        &self.run_state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn collect_pipeline_config(&self) -> QuerySpecification {
        collect_pipeline_config(&self.graph)
    }

    pub fn add_node(&mut self, kind: NodeKind, position: Option<Position>) -> (NodeId, CoreStep) {
        let id = self.graph.add_node(kind, position);
        info!(node = %id, %kind, "node added");
        (id, CoreStep::none())
    }

    /// Delete a node and its edges. Removing a node that shapes the query
    /// re-arms the debounce.
    pub fn delete_node(&mut self, id: &str) -> (bool, CoreStep) {
        let Some(node) = self.graph.remove_node(id) else {
            debug!(node = %id, "delete of unknown node ignored");
            return (false, CoreStep::none());
        };
        info!(node = %id, kind = %node.kind(), "node deleted");

        let mut commands = Vec::new();
        if node.kind().affects_run() {
            self.arm_debounce(&mut commands);
        }
        (true, CoreStep::with(commands))
    }

    /// Add `source -> target`; a new edge arms both the debounce and the
    /// short connect check.
    pub fn connect(&mut self, source: &str, target: &str) -> (Result<bool>, CoreStep) {
        let added = match self.graph.add_edge(source, target) {
            Ok(added) => added,
            Err(err) => return (Err(err), CoreStep::none()),
        };
        if !added {
            return (Ok(false), CoreStep::none());
        }
        info!(%source, %target, "nodes connected");

        let mut commands = Vec::new();
        self.arm_debounce(&mut commands);
        let ticket = self.scheduler.schedule_connect_check();
        commands.push(EngineCommand::ArmTimer {
            timer: TimerKind::ConnectCheck,
            ticket,
            delay: self.options.connect_check,
        });
        (Ok(true), CoreStep::with(commands))
    }

    /// Shallow-merge `patch` into a node's payload.
    ///
    /// Returns `Ok(false)` for an unknown node. Edits to kinds that shape
    /// the query re-arm the debounce.
    pub fn update_node_data(&mut self, id: &str, patch: &Value) -> (Result<bool>, CoreStep) {
        let kind = match self.graph.update_node_data(id, patch) {
            Ok(Some(kind)) => kind,
            Ok(None) => return (Ok(false), CoreStep::none()),
            Err(err) => return (Err(err), CoreStep::none()),
        };
        debug!(node = %id, %kind, "node data updated");

        let mut commands = Vec::new();
        if kind.affects_run() {
            self.arm_debounce(&mut commands);
        }
        (Ok(true), CoreStep::with(commands))
    }

    /// Run the current specification now, bypassing the debounce.
    pub fn trigger_query(&mut self) -> (TriggerStart, CoreStep) {
        let spec = self.collect_pipeline_config();
        if !spec.has_source {
            let err = QueryError::NoSourceConnected;
            warn!(error = %err, "manual trigger without a source node");
            self.run_state.error = Some(err.to_string());
            return (
                TriggerStart::Finished(RunOutcome::Failed(err)),
                CoreStep::none(),
            );
        }

        let mut commands = Vec::new();
        let sequence = self.dispatch(spec, &mut commands);
        (TriggerStart::Dispatched(sequence), CoreStep::with(commands))
    }

    /// Empty the graph, cancel timers and reset the run state. Responses to
    /// queries still in flight will be discarded.
    pub fn clear_all(&mut self) -> CoreStep {
        self.graph.clear();
        self.scheduler.reset();
        self.run_state = PipelineRunState::default();
        info!("graph cleared");

        CoreStep::with(vec![
            EngineCommand::CancelTimer {
                timer: TimerKind::Debounce,
            },
            EngineCommand::CancelTimer {
                timer: TimerKind::ConnectCheck,
            },
        ])
    }

    /// Handle a single non-edit event.
    pub fn step(&mut self, event: EngineEvent) -> CoreStep {
        match event {
            EngineEvent::TimerElapsed { timer, ticket } => self.handle_timer(timer, ticket),
            EngineEvent::QuerySettled { sequence, outcome } => {
                self.handle_settled(sequence, outcome)
            }
            EngineEvent::ShutdownRequested => CoreStep {
                commands: vec![EngineCommand::Exit],
                keep_running: false,
            },
        }
    }

    fn handle_timer(&mut self, timer: TimerKind, ticket: u64) -> CoreStep {
        if !self.scheduler.fire(timer, ticket) {
            debug!(?timer, ticket, "ignoring superseded timer");
            return CoreStep::none();
        }

        let spec = self.collect_pipeline_config();
        let should_run = match timer {
            TimerKind::Debounce => spec.has_constraints(),
            TimerKind::ConnectCheck => spec.has_source && !spec.filters.is_empty(),
        };
        if !should_run {
            debug!(?timer, "nothing to query; skipping run");
            return CoreStep::none();
        }

        debug!(?timer, "timer elapsed; dispatching query");
        let mut commands = Vec::new();
        self.dispatch(spec, &mut commands);
        CoreStep::with(commands)
    }

    fn handle_settled(
        &mut self,
        sequence: u64,
        outcome: std::result::Result<QueryResult, QueryError>,
    ) -> CoreStep {
        let outcome = match self.scheduler.settle(sequence) {
            Settlement::Stale { latest } => {
                let discarded = QueryError::StaleResponseDiscarded { sequence, latest };
                debug!(reason = %discarded, "dropping response");
                RunOutcome::Superseded { sequence, latest }
            }
            Settlement::Current => match outcome {
                Ok(result) => {
                    info!(sequence, rows = result.rows.len(), "pipeline run completed");
                    self.graph = propagate(mem::take(&mut self.graph), &result);
                    self.run_state = PipelineRunState {
                        loading: false,
                        error: None,
                        last_result: Some(result.clone()),
                    };
                    RunOutcome::Completed(result)
                }
                Err(err) => {
                    warn!(sequence, error = %err, "pipeline run failed");
                    mark_loading(&mut self.graph, false);
                    self.run_state.loading = false;
                    self.run_state.error = Some(err.to_string());
                    RunOutcome::Failed(err)
                }
            },
        };

        CoreStep::with(vec![EngineCommand::ResolveRun { sequence, outcome }])
    }

    fn arm_debounce(&mut self, commands: &mut Vec<EngineCommand>) {
        let ticket = self.scheduler.schedule();
        debug!(ticket, delay = ?self.options.debounce, "debounce armed");
        commands.push(EngineCommand::ArmTimer {
            timer: TimerKind::Debounce,
            ticket,
            delay: self.options.debounce,
        });
    }

    fn dispatch(&mut self, spec: QuerySpecification, commands: &mut Vec<EngineCommand>) -> u64 {
        let dispatch = self.scheduler.begin_dispatch();
        if dispatch.absorbed_debounce {
            debug!(sequence = dispatch.sequence, "pending debounce absorbed by dispatch");
            commands.push(EngineCommand::CancelTimer {
                timer: TimerKind::Debounce,
            });
        }

        self.run_state.loading = true;
        self.run_state.error = None;
        mark_loading(&mut self.graph, true);

        info!(
            sequence = dispatch.sequence,
            filters = ?spec.filters,
            columns = ?spec.columns,
            "dispatching pipeline query"
        );
        commands.push(EngineCommand::ExecuteQuery {
            sequence: dispatch.sequence,
            spec,
        });
        dispatch.sequence
    }
}
