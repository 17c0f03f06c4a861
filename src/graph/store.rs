// src/graph/store.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{PipegraphError, Result};
use crate::graph::node::{DEFAULT_TABLE, Node, NodeData, NodeId, Position};
use crate::types::NodeKind;

/// Directed dependency: `target` consumes state flowing from `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// In-memory node and edge collections.
///
/// Nodes and edges keep insertion order; traversal and "first source wins"
/// lookups depend on it. The store guarantees that no edge ever references a
/// node it does not hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    table: Option<String>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose new source nodes point at `table`.
    pub fn with_table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or(DEFAULT_TABLE)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node of `kind` with its default payload and return its new id.
    ///
    /// Ids are `<kind>-<unix millis>`, suffixed with `-<n>` when two nodes are
    /// created within the same millisecond.
    pub fn add_node(&mut self, kind: NodeKind, position: Option<Position>) -> NodeId {
        let id = self.fresh_id(kind);
        let position = position.unwrap_or_else(|| self.next_position());
        let data = NodeData::default_for(kind, self.table());

        if kind == NodeKind::Source && self.source_nodes().next().is_some() {
            warn!(node = %id, "graph already has a source node; the first one keeps driving queries");
        }

        debug!(node = %id, %kind, "adding node");
        self.nodes.push(Node::new(id.clone(), position, data));
        id
    }

    /// Insert a fully-formed node (used when seeding a graph from config).
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.contains(node.id()) {
            return Err(PipegraphError::DuplicateNode(node.id().to_string()));
        }
        debug!(node = %node.id(), kind = %node.kind(), "inserting node");
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.nodes.iter().position(|n| n.id() == id)?;
        let removed_edges = self.remove_edges_touching(id);
        let node = self.nodes.remove(idx);
        debug!(node = %id, removed_edges, "removed node");
        Some(node)
    }

    /// Connect `source -> target`.
    ///
    /// Returns `Ok(false)` when the identical edge already exists.
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<bool> {
        for endpoint in [source, target] {
            if !self.contains(endpoint) {
                return Err(PipegraphError::NodeNotFound(endpoint.to_string()));
            }
        }

        let edge = Edge::new(source, target);
        if self.edges.contains(&edge) {
            debug!(%source, %target, "edge already present; ignoring");
            return Ok(false);
        }

        debug!(%source, %target, "adding edge");
        self.edges.push(edge);
        Ok(true)
    }

    /// Drop every edge with `id` as either endpoint; returns how many were removed.
    pub fn remove_edges_touching(&mut self, id: &str) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        before - self.edges.len()
    }

    /// Shallow-merge `patch` into the payload of node `id`.
    ///
    /// An unknown id is a no-op and returns `Ok(None)`; otherwise the node's
    /// kind is returned.
    pub fn update_node_data(&mut self, id: &str, patch: &Value) -> Result<Option<NodeKind>> {
        let Some(node) = self.node_mut(id) else {
            debug!(node = %id, "update for unknown node; ignoring");
            return Ok(None);
        };

        node.merge_patch(patch)
            .map_err(|reason| PipegraphError::InvalidPatch {
                node: id.to_string(),
                reason,
            })?;
        Ok(Some(node.kind()))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// All source nodes in insertion order.
    pub fn source_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind() == NodeKind::Source)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    fn fresh_id(&self, kind: NodeKind) -> NodeId {
        let base = format!("{}-{}", kind.slug(), chrono::Utc::now().timestamp_millis());
        if !self.contains(&base) {
            return base;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Default placement for the next node, staggered so nodes do not overlap.
    pub fn next_position(&self) -> Position {
        let n = self.nodes.len() as f64;
        Position {
            x: 200.0 + (n % 5.0) * 80.0,
            y: 100.0 + (n / 5.0).floor() * 60.0,
        }
    }
}
