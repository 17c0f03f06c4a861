// src/pipeline/collector.rs

//! Derive a query specification by walking the graph from its source node.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::graph::node::NodeData;
use crate::graph::{GraphStore, downstream_of};
use crate::pipeline::columns::columns_for_label;
use crate::types::FilterKey;

/// Equality filters keyed by region column.
pub type Filters = BTreeMap<FilterKey, String>;

/// Filter + column description of the query a graph currently asks for.
///
/// Derived on demand from a graph snapshot and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpecification {
    pub filters: Filters,
    /// Physical columns, deduplicated, in order of first appearance.
    pub columns: Vec<String>,
    pub has_source: bool,
    /// Table named by the source node; empty without a source.
    pub table: String,
}

impl QuerySpecification {
    /// Whether a debounced run should actually execute this specification.
    pub fn has_constraints(&self) -> bool {
        !self.filters.is_empty() || !self.columns.is_empty()
    }
}

/// Walk downstream from the graph's source node and fold each node's
/// contribution into a [`QuerySpecification`].
///
/// - Region filters: the last visited node wins per filter key.
/// - Column selectors: labels are expanded and unioned into the column list.
pub fn collect_pipeline_config(graph: &GraphStore) -> QuerySpecification {
    let mut sources = graph.source_nodes();
    let Some(source) = sources.next() else {
        return QuerySpecification::default();
    };
    if sources.next().is_some() {
        warn!(source = %source.id(), "multiple source nodes; collecting from the first");
    }

    let table = match source.data() {
        NodeData::Source(data) => data.table_name.clone(),
        _ => graph.table().to_string(),
    };

    let mut spec = QuerySpecification {
        has_source: true,
        table,
        ..QuerySpecification::default()
    };
    let mut seen_columns: HashSet<String> = HashSet::new();

    for node in downstream_of(graph, source.id()) {
        match node.data() {
            NodeData::RegionFilter(region) => {
                let values = [
                    (FilterKey::State, &region.state),
                    (FilterKey::District, &region.district),
                    (FilterKey::Pincode, &region.pincode),
                ];
                for (key, value) in values {
                    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                        spec.filters.insert(key, value.to_string());
                    }
                }
            }
            NodeData::ColumnSelector(selector) => {
                let mapped = selector
                    .selected_columns
                    .iter()
                    .flat_map(|label| columns_for_label(label).iter());
                for column in mapped {
                    if seen_columns.insert(column.to_string()) {
                        spec.columns.push(column.to_string());
                    }
                }
            }
            NodeData::Source(_)
            | NodeData::LogicProcessor(_)
            | NodeData::ActionOutput(_)
            | NodeData::Visualizer(_) => {}
        }
    }

    debug!(
        filters = ?spec.filters,
        columns = ?spec.columns,
        "collected pipeline configuration"
    );
    spec
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::NodeKind;

    fn node(graph: &mut GraphStore, kind: NodeKind, patch: serde_json::Value) -> String {
        let id = graph.add_node(kind, None);
        graph.update_node_data(&id, &patch).unwrap();
        id
    }

    #[test]
    fn no_source_short_circuits() {
        let mut graph = GraphStore::new();
        node(&mut graph, NodeKind::RegionFilter, json!({ "state": "Goa" }));
        let spec = collect_pipeline_config(&graph);
        assert!(!spec.has_source);
        assert!(spec.filters.is_empty());
    }

    #[test]
    fn later_region_filter_overwrites_earlier() {
        let mut graph = GraphStore::new();
        let src = node(&mut graph, NodeKind::Source, json!({}));
        let first = node(&mut graph, NodeKind::RegionFilter, json!({ "state": "Odisha", "district": "Puri" }));
        let second = node(&mut graph, NodeKind::RegionFilter, json!({ "state": "Maharashtra" }));
        let viz = node(&mut graph, NodeKind::Visualizer, json!({}));
        graph.add_edge(&src, &first).unwrap();
        graph.add_edge(&first, &second).unwrap();
        graph.add_edge(&second, &viz).unwrap();

        let spec = collect_pipeline_config(&graph);

        assert_eq!(spec.filters.get(&FilterKey::State).map(String::as_str), Some("Maharashtra"));
        assert_eq!(spec.filters.get(&FilterKey::District).map(String::as_str), Some("Puri"));
        assert_eq!(spec.table, "enrollments");
    }

    #[test]
    fn empty_strings_do_not_filter() {
        let mut graph = GraphStore::new();
        let src = node(&mut graph, NodeKind::Source, json!({}));
        let region = node(&mut graph, NodeKind::RegionFilter, json!({ "state": "", "pincode": "751001" }));
        graph.add_edge(&src, &region).unwrap();

        let spec = collect_pipeline_config(&graph);
        assert_eq!(spec.filters.len(), 1);
        assert_eq!(spec.filters[&FilterKey::Pincode], "751001");
    }

    #[test]
    fn column_selectors_union_without_duplicates() {
        let mut graph = GraphStore::new();
        let src = node(&mut graph, NodeKind::Source, json!({}));
        let kids = node(&mut graph, NodeKind::ColumnSelector, json!({ "selectedColumns": ["Age 0-5 (Children)"] }));
        let adults = node(&mut graph, NodeKind::ColumnSelector, json!({ "selectedColumns": ["Age 18+ (Adults)", "Age 0-5 (Children)"] }));
        let viz = node(&mut graph, NodeKind::Visualizer, json!({}));
        graph.add_edge(&src, &kids).unwrap();
        graph.add_edge(&src, &adults).unwrap();
        graph.add_edge(&kids, &viz).unwrap();
        graph.add_edge(&adults, &viz).unwrap();

        let spec = collect_pipeline_config(&graph);
        assert_eq!(spec.columns, vec!["age_0_5", "age_18_plus"]);
        assert!(spec.has_constraints());
    }

    #[test]
    fn disconnected_nodes_do_not_contribute() {
        let mut graph = GraphStore::new();
        node(&mut graph, NodeKind::Source, json!({}));
        node(&mut graph, NodeKind::RegionFilter, json!({ "state": "Kerala" }));

        let spec = collect_pipeline_config(&graph);
        assert!(spec.has_source);
        assert!(!spec.has_constraints());
    }

    #[test]
    fn collecting_twice_is_idempotent() {
        let mut graph = GraphStore::new();
        let src = node(&mut graph, NodeKind::Source, json!({}));
        let region = node(&mut graph, NodeKind::RegionFilter, json!({ "state": "Bihar" }));
        graph.add_edge(&src, &region).unwrap();

        assert_eq!(collect_pipeline_config(&graph), collect_pipeline_config(&graph));
    }
}
