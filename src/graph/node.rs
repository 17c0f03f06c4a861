// src/graph/node.rs

//! Nodes and their kind-specific payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pipeline::collector::Filters;
use crate::store::Row;
use crate::types::{NodeKind, Signal};

/// Canonical node identifier type used throughout the engine.
pub type NodeId = String;

/// Table name a fresh source node points at when nothing else is configured.
pub const DEFAULT_TABLE: &str = "enrollments";

/// Canvas position; carried for the presentation layer, ignored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceData {
    pub connected: bool,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionFilterData {
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSelectorData {
    pub selected_column_ids: Vec<String>,
    /// Display labels, expanded through [`crate::pipeline::columns`].
    pub selected_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicProcessorData {
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub signal: Signal,
    pub query_result: Option<Vec<Row>>,
    pub loading: bool,
}

impl Default for LogicProcessorData {
    fn default() -> Self {
        Self {
            metric: "total".to_string(),
            operator: "lt".to_string(),
            threshold: 50.0,
            signal: Signal::Unevaluated,
            query_result: None,
            loading: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionOutputData {
    pub signal: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizerData {
    pub query_result: Option<Vec<Row>>,
    pub filters: Filters,
    pub loading: bool,
}

/// Kind-specific payload of a node.
///
/// Serialises as the bare payload object; the kind travels alongside it on
/// [`Node`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    Source(SourceData),
    RegionFilter(RegionFilterData),
    ColumnSelector(ColumnSelectorData),
    LogicProcessor(LogicProcessorData),
    ActionOutput(ActionOutputData),
    Visualizer(VisualizerData),
}

impl NodeData {
    /// Payload a freshly added node of `kind` starts with.
    pub fn default_for(kind: NodeKind, table: &str) -> Self {
        match kind {
            NodeKind::Source => NodeData::Source(SourceData {
                connected: true,
                table_name: table.to_string(),
            }),
            NodeKind::RegionFilter => NodeData::RegionFilter(RegionFilterData::default()),
            NodeKind::ColumnSelector => NodeData::ColumnSelector(ColumnSelectorData {
                selected_column_ids: vec!["age".to_string()],
                selected_columns: vec!["Age Groups (All)".to_string()],
            }),
            NodeKind::LogicProcessor => NodeData::LogicProcessor(LogicProcessorData::default()),
            NodeKind::ActionOutput => NodeData::ActionOutput(ActionOutputData::default()),
            NodeKind::Visualizer => NodeData::Visualizer(VisualizerData::default()),
        }
    }

    /// Decode a payload object for the given kind.
    pub fn from_value(kind: NodeKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            NodeKind::Source => NodeData::Source(serde_json::from_value(value)?),
            NodeKind::RegionFilter => NodeData::RegionFilter(serde_json::from_value(value)?),
            NodeKind::ColumnSelector => NodeData::ColumnSelector(serde_json::from_value(value)?),
            NodeKind::LogicProcessor => NodeData::LogicProcessor(serde_json::from_value(value)?),
            NodeKind::ActionOutput => NodeData::ActionOutput(serde_json::from_value(value)?),
            NodeKind::Visualizer => NodeData::Visualizer(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Source(_) => NodeKind::Source,
            NodeData::RegionFilter(_) => NodeKind::RegionFilter,
            NodeData::ColumnSelector(_) => NodeKind::ColumnSelector,
            NodeData::LogicProcessor(_) => NodeKind::LogicProcessor,
            NodeData::ActionOutput(_) => NodeKind::ActionOutput,
            NodeData::Visualizer(_) => NodeKind::Visualizer,
        }
    }

    /// Payload as a JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Shallow-merge `patch` into this payload.
    ///
    /// Keys of `patch` replace the payload's top-level fields; keys the kind
    /// does not know are dropped. On error the payload is left unchanged.
    pub fn merge_patch(&mut self, patch: &Value) -> Result<(), String> {
        let patch = match patch {
            Value::Object(map) => map,
            Value::Null => return Ok(()),
            other => return Err(format!("patch must be an object, got {other}")),
        };

        let mut merged = match self.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }

        let updated =
            NodeData::from_value(self.kind(), Value::Object(merged)).map_err(|e| e.to_string())?;
        *self = updated;
        Ok(())
    }
}

/// A typed configuration unit in the pipeline graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    position: Position,
    data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, position: Position, data: NodeData) -> Self {
        Self {
            id: id.into(),
            kind: data.kind(),
            position,
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Replace the payload; a payload of another kind is rejected.
    pub fn set_data(&mut self, data: NodeData) -> bool {
        if data.kind() != self.kind {
            return false;
        }
        self.data = data;
        true
    }

    pub fn merge_patch(&mut self, patch: &Value) -> Result<(), String> {
        self.data.merge_patch(patch)
    }
}
