// src/config/validate.rs

use std::sync::LazyLock;
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::model::{ConfigFile, EngineSection, EngineSettings, RawConfigFile};
use crate::errors::{PipegraphError, Result};
use crate::graph::node::{Node, NodeData};
use crate::graph::GraphStore;
use crate::types::NodeKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipegraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let engine = validate_engine_section(&raw.engine)?;
        let graph = build_graph(&raw, &engine.table)?;
        warn_on_cycles(&raw);
        Ok(ConfigFile::new_unchecked(engine, graph))
    }
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*(ms|s|m|h)$").expect("duration pattern is valid")
});

/// Parse a duration string like `"500ms"`, `"3s"`, `"1m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let caps = DURATION_RE.captures(s.trim()).ok_or_else(|| {
        PipegraphError::ConfigError(format!(
            "invalid duration '{s}'; expected a whole number followed by ms, s, m, or h"
        ))
    })?;

    let value: u64 = caps[1]
        .parse()
        .map_err(|e| PipegraphError::ConfigError(format!("invalid duration '{s}': {e}")))?;

    let secs_per_unit = match &caps[2] {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        _ => 60 * 60,
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| PipegraphError::ConfigError(format!("duration '{s}' is too large")))
}

fn validate_engine_section(engine: &EngineSection) -> Result<EngineSettings> {
    if engine.table.trim().is_empty() {
        return Err(PipegraphError::ConfigError(
            "[engine].table must not be empty".to_string(),
        ));
    }
    if engine.row_limit == 0 {
        return Err(PipegraphError::ConfigError(
            "[engine].row_limit must be >= 1 (got 0)".to_string(),
        ));
    }

    let debounce = parse_duration(&engine.debounce)?;
    let query_timeout = parse_duration(&engine.query_timeout)?;
    for (key, value) in [("debounce", debounce), ("query_timeout", query_timeout)] {
        if value.is_zero() {
            return Err(PipegraphError::ConfigError(format!(
                "[engine].{key} must be greater than zero"
            )));
        }
    }

    Ok(EngineSettings {
        table: engine.table.clone(),
        debounce,
        connect_check: parse_duration(&engine.connect_check)?,
        row_limit: engine.row_limit,
        query_timeout,
    })
}

fn build_graph(cfg: &RawConfigFile, table: &str) -> Result<GraphStore> {
    let sources: Vec<&str> = cfg
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Source)
        .map(|n| n.id.as_str())
        .collect();
    if sources.len() > 1 {
        return Err(PipegraphError::ConfigError(format!(
            "at most one source node is allowed (found {})",
            sources.join(", ")
        )));
    }

    let mut graph = GraphStore::with_table(table);

    for node in &cfg.nodes {
        if node.id.trim().is_empty() {
            return Err(PipegraphError::ConfigError(
                "[[node]] entries need a non-empty id".to_string(),
            ));
        }

        let mut data = NodeData::default_for(node.kind, table);
        if let Some(fields) = &node.data {
            let patch = serde_json::to_value(fields)?;
            data.merge_patch(&patch).map_err(|reason| {
                PipegraphError::ConfigError(format!(
                    "node '{}' has invalid data for kind {}: {reason}",
                    node.id, node.kind
                ))
            })?;
        }

        let position = node.position.unwrap_or_else(|| graph.next_position());
        graph
            .insert_node(Node::new(node.id.clone(), position, data))
            .map_err(|_| {
                PipegraphError::ConfigError(format!("node '{}' is defined more than once", node.id))
            })?;
    }

    for edge in &cfg.edges {
        match graph.add_edge(&edge.source, &edge.target) {
            Ok(true) => {}
            Ok(false) => {
                warn!(source = %edge.source, target = %edge.target, "duplicate edge in config; ignoring");
            }
            Err(PipegraphError::NodeNotFound(id)) => {
                return Err(PipegraphError::ConfigError(format!(
                    "edge '{}' -> '{}' references unknown node '{id}'",
                    edge.source, edge.target
                )));
            }
            Err(err) => return Err(err),
        }
    }

    debug!(
        nodes = graph.nodes().len(),
        edges = graph.edges().len(),
        "seeded graph from config"
    );
    Ok(graph)
}

/// Cycles are legal (traversal is cycle-safe) but usually a wiring mistake.
fn warn_on_cycles(cfg: &RawConfigFile) {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in &cfg.nodes {
        graph.add_node(node.id.as_str());
    }
    for edge in &cfg.edges {
        graph.add_edge(edge.source.as_str(), edge.target.as_str(), ());
    }

    if let Err(cycle) = toposort(&graph, None) {
        warn!(
            node = cycle.node_id(),
            "pipeline graph contains a cycle; each node is still visited once per walk"
        );
    }
}
