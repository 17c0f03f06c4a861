// src/engine/mod.rs

//! Reactive execution engine for a pipeline graph.
//!
//! This module ties together:
//! - the graph store and the pure pipeline functions
//! - the debounce/dispatch [`scheduler`]
//! - the async runtime that reacts to:
//!   - graph edits coming from an [`EngineHandle`]
//!   - elapsed debounce and connect-check timers
//!   - settled queries
//!   - shutdown requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`] and driven through [`handle`].

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::errors::QueryError;
use crate::pipeline::QuerySpecification;
use crate::store::QueryResult;

pub mod core;
pub mod handle;
pub mod runtime;
pub mod scheduler;

pub use self::core::{CoreEngine, CoreStep, TriggerStart};
pub use handle::{EngineHandle, spawn_engine};
pub use runtime::Runtime;
pub use scheduler::{Phase, Scheduler, TimerKind};

/// Default trailing debounce window after a query-affecting edit.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default delay of the post-connect check.
pub const DEFAULT_CONNECT_CHECK: Duration = Duration::from_millis(100);

/// Timing options shared by the core and the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub debounce: Duration,
    pub connect_check: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            connect_check: DEFAULT_CONNECT_CHECK,
        }
    }
}

/// Observable state of the most recent pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunState {
    pub loading: bool,
    pub error: Option<String>,
    pub last_result: Option<QueryResult>,
}

/// What happened to a manually triggered run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(QueryResult),
    Failed(QueryError),
    /// A newer run was dispatched before this one settled; its response was
    /// discarded.
    Superseded { sequence: u64, latest: u64 },
}

impl RunOutcome {
    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed(result) => write!(
                f,
                "run {} completed with {} row(s)",
                result.sequence,
                result.rows.len()
            ),
            RunOutcome::Failed(err) => write!(f, "run failed: {err}"),
            RunOutcome::Superseded { sequence, latest } => {
                write!(f, "run {sequence} superseded by run {latest}")
            }
        }
    }
}

/// Events fed into the core that do not originate from a graph edit.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A timer armed with `ticket` has elapsed.
    TimerElapsed { timer: TimerKind, ticket: u64 },
    /// The query dispatched as `sequence` finished.
    QuerySettled {
        sequence: u64,
        outcome: Result<QueryResult, QueryError>,
    },
    ShutdownRequested,
}

/// Command produced by the pure core, to be executed by the IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Start (or restart) `timer`; report back with `ticket` after `delay`.
    ArmTimer {
        timer: TimerKind,
        ticket: u64,
        delay: Duration,
    },
    /// Stop `timer` if it is running.
    CancelTimer { timer: TimerKind },
    /// Run `spec` against the data store and report back with `sequence`.
    ExecuteQuery {
        sequence: u64,
        spec: QuerySpecification,
    },
    /// Hand `outcome` to whoever is waiting on `sequence`.
    ResolveRun { sequence: u64, outcome: RunOutcome },
    /// Stop the runtime loop.
    Exit,
}
