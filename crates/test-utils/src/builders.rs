#![allow(dead_code)]

use pipegraph::config::{ConfigFile, EdgeConfig, NodeConfig, RawConfigFile};
use pipegraph::graph::node::{DEFAULT_TABLE, Node, NodeData};
use pipegraph::graph::{GraphStore, Position};
use pipegraph::types::NodeKind;
use serde_json::Value;

/// Builder for a `GraphStore` with caller-chosen node ids.
pub struct GraphBuilder {
    graph: GraphStore,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: GraphStore::new(),
        }
    }

    /// Add a node of `kind` with its default payload.
    pub fn node(self, id: &str, kind: NodeKind) -> Self {
        self.node_with(id, kind, Value::Null)
    }

    /// Add a node of `kind` whose default payload is patched with `data`.
    pub fn node_with(mut self, id: &str, kind: NodeKind, data: Value) -> Self {
        let mut payload = NodeData::default_for(kind, DEFAULT_TABLE);
        payload
            .merge_patch(&data)
            .expect("builder data must fit the node kind");
        let position = self.graph.next_position();
        self.graph
            .insert_node(Node::new(id, position, payload))
            .expect("builder node ids must be unique");
        self
    }

    pub fn edge(mut self, source: &str, target: &str) -> Self {
        self.graph
            .add_edge(source, target)
            .expect("builder edges must reference existing nodes");
        self
    }

    pub fn build(self) -> GraphStore {
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The usual shape of a test pipeline: `source -> region -> viz`, with
/// `source -> rule -> action` alongside.
pub fn standard_pipeline() -> GraphStore {
    GraphBuilder::new()
        .node("source", NodeKind::Source)
        .node("region", NodeKind::RegionFilter)
        .node("viz", NodeKind::Visualizer)
        .node("rule", NodeKind::LogicProcessor)
        .node("action", NodeKind::ActionOutput)
        .edge("source", "region")
        .edge("region", "viz")
        .edge("source", "rule")
        .edge("rule", "action")
        .build()
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn debounce(mut self, value: &str) -> Self {
        self.config.engine.debounce = value.to_string();
        self
    }

    pub fn connect_check(mut self, value: &str) -> Self {
        self.config.engine.connect_check = value.to_string();
        self
    }

    pub fn row_limit(mut self, value: usize) -> Self {
        self.config.engine.row_limit = value;
        self
    }

    pub fn table(mut self, value: &str) -> Self {
        self.config.engine.table = value.to_string();
        self
    }

    pub fn node(mut self, id: &str, kind: NodeKind) -> Self {
        self.config.nodes.push(NodeConfig {
            id: id.to_string(),
            kind,
            position: None::<Position>,
            data: None,
        });
        self
    }

    pub fn edge(mut self, source: &str, target: &str) -> Self {
        self.config.edges.push(EdgeConfig {
            source: source.to_string(),
            target: target.to_string(),
        });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
