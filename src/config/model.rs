// src/config/model.rs

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::EngineOptions;
use crate::graph::{GraphStore, NodeId, Position};
use crate::store::{DataStore, QueryExecutor};
use crate::types::NodeKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [engine]
/// table = "enrollments"
/// debounce = "500ms"
///
/// [[node]]
/// id = "source"
/// kind = "source"
///
/// [[node]]
/// id = "odisha"
/// kind = "regionFilter"
/// data = { state = "Odisha" }
///
/// [[edge]]
/// source = "source"
/// target = "odisha"
/// ```
///
/// All sections are optional; an empty file yields an empty graph with the
/// default engine settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeConfig>,

    #[serde(default, rename = "edge")]
    pub edges: Vec<EdgeConfig>,
}

/// `[engine]` section. Durations are strings such as `"500ms"` or `"10s"`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_table")]
    pub table: String,

    /// Trailing debounce window after a query-affecting edit.
    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// Delay of the follow-up check after a new connection.
    #[serde(default = "default_connect_check")]
    pub connect_check: String,

    #[serde(default = "default_row_limit")]
    pub row_limit: usize,

    #[serde(default = "default_query_timeout")]
    pub query_timeout: String,
}

fn default_table() -> String {
    crate::graph::node::DEFAULT_TABLE.to_string()
}

fn default_debounce() -> String {
    "500ms".to_string()
}

fn default_connect_check() -> String {
    "100ms".to_string()
}

fn default_row_limit() -> usize {
    crate::store::DEFAULT_ROW_LIMIT
}

fn default_query_timeout() -> String {
    "10s".to_string()
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            table: default_table(),
            debounce: default_debounce(),
            connect_check: default_connect_check(),
            row_limit: default_row_limit(),
            query_timeout: default_query_timeout(),
        }
    }
}

/// `[[node]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub id: NodeId,

    /// Node kind slug, e.g. `"regionFilter"`.
    pub kind: NodeKind,

    #[serde(default)]
    pub position: Option<Position>,

    /// Fields shallow-merged over the kind's default payload.
    #[serde(default)]
    pub data: Option<toml::Table>,
}

/// `[[edge]]` entry: `target` consumes what `source` produces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EdgeConfig {
    pub source: NodeId,
    pub target: NodeId,
}

/// Parsed `[engine]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub table: String,
    pub debounce: Duration,
    pub connect_check: Duration,
    pub row_limit: usize,
    pub query_timeout: Duration,
}

/// A validated configuration: engine settings plus the seeded graph.
///
/// Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub graph: GraphStore,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(engine: EngineSettings, graph: GraphStore) -> Self {
        Self { engine, graph }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            debounce: self.engine.debounce,
            connect_check: self.engine.connect_check,
        }
    }

    /// A query executor over `store` with the configured row cap and timeout.
    pub fn executor(&self, store: Arc<dyn DataStore>) -> QueryExecutor {
        QueryExecutor::new(store)
            .with_row_limit(self.engine.row_limit)
            .with_timeout(self.engine.query_timeout)
    }
}
