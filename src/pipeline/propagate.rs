// src/pipeline/propagate.rs

//! Push a query result into the nodes that consume it.

use std::collections::HashMap;

use tracing::debug;

use crate::graph::node::NodeData;
use crate::graph::{GraphStore, NodeId};
use crate::pipeline::signal::evaluate;
use crate::store::QueryResult;
use crate::types::Signal;

/// Return `graph` with `result` written into every consumer node.
///
/// - Visualizers get the rows and filters.
/// - Logic processors keep their rule, get the rows and a freshly evaluated
///   signal.
/// - Action outputs copy the signal of a directly connected logic processor
///   (one hop only), or `false` without one. With several such parents the
///   first in node order wins, regardless of edge order.
///
/// Logic processors are settled before action outputs read them, so an
/// action output always sees the signal computed from this result.
pub fn propagate(mut graph: GraphStore, result: &QueryResult) -> GraphStore {
    let mut signals: HashMap<NodeId, Signal> = HashMap::new();

    for node in graph.nodes_mut() {
        let id = node.id().to_string();
        let updated = match node.data() {
            NodeData::Visualizer(viz) => {
                let mut viz = viz.clone();
                viz.query_result = Some(result.rows.clone());
                viz.filters = result.filters.clone();
                viz.loading = false;
                Some(NodeData::Visualizer(viz))
            }
            NodeData::LogicProcessor(logic) => {
                let mut logic = logic.clone();
                logic.signal = evaluate(Some(result.rows.as_slice()), &logic);
                logic.query_result = Some(result.rows.clone());
                logic.loading = false;
                signals.insert(id.clone(), logic.signal);
                Some(NodeData::LogicProcessor(logic))
            }
            NodeData::Source(_)
            | NodeData::RegionFilter(_)
            | NodeData::ColumnSelector(_)
            | NodeData::ActionOutput(_) => None,
        };
        if let Some(data) = updated {
            node.set_data(data);
        }
    }

    let action_signals: Vec<(NodeId, bool)> = graph
        .nodes()
        .iter()
        .filter(|n| matches!(n.data(), NodeData::ActionOutput(_)))
        .map(|action| {
            let signal = graph
                .nodes()
                .iter()
                .filter(|n| feeds(&graph, n.id(), action.id()))
                .find_map(|up| signals.get(up.id()).copied())
                .unwrap_or_default();
            (action.id().to_string(), signal.is_alert())
        })
        .collect();

    for (id, alert) in action_signals {
        if let Some(node) = graph.node_mut(&id) {
            if let NodeData::ActionOutput(mut action) = node.data().clone() {
                action.signal = alert;
                node.set_data(NodeData::ActionOutput(action));
            }
        }
    }

    debug!(
        sequence = result.sequence,
        rows = result.rows.len(),
        logic_nodes = signals.len(),
        "propagated query result"
    );
    graph
}

/// Set the `loading` flag on every node that displays query output.
pub fn mark_loading(graph: &mut GraphStore, loading: bool) {
    for node in graph.nodes_mut() {
        let updated = match node.data() {
            NodeData::Visualizer(viz) if viz.loading != loading => {
                let mut viz = viz.clone();
                viz.loading = loading;
                Some(NodeData::Visualizer(viz))
            }
            NodeData::LogicProcessor(logic) if logic.loading != loading => {
                let mut logic = logic.clone();
                logic.loading = loading;
                Some(NodeData::LogicProcessor(logic))
            }
            _ => None,
        };
        if let Some(data) = updated {
            node.set_data(data);
        }
    }
}

fn feeds(graph: &GraphStore, source: &str, target: &str) -> bool {
    graph
        .edges()
        .iter()
        .any(|e| e.source == source && e.target == target)
}
