// src/graph/traversal.rs

//! Cycle-safe reachability over a [`GraphStore`] snapshot.

use std::collections::HashSet;

use crate::graph::node::Node;
use crate::graph::store::{Edge, GraphStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Downstream,
    Upstream,
}

impl Direction {
    fn origin(self, edge: &Edge) -> &str {
        match self {
            Direction::Downstream => &edge.source,
            Direction::Upstream => &edge.target,
        }
    }

    fn destination(self, edge: &Edge) -> &str {
        match self {
            Direction::Downstream => &edge.target,
            Direction::Upstream => &edge.source,
        }
    }
}

/// Nodes reachable from `id` by following edges forwards, in depth-first
/// first-visit order.
///
/// Each node appears at most once and `id` itself is never included, even
/// when a cycle leads back to it.
pub fn downstream_of<'g>(graph: &'g GraphStore, id: &str) -> Vec<&'g Node> {
    walk(graph, id, Direction::Downstream)
}

/// Nodes reachable from `id` by following edges backwards.
pub fn upstream_of<'g>(graph: &'g GraphStore, id: &str) -> Vec<&'g Node> {
    walk(graph, id, Direction::Upstream)
}

/// Direct predecessors of `id`, in edge order.
pub fn direct_upstream_of<'g>(graph: &'g GraphStore, id: &str) -> Vec<&'g Node> {
    graph
        .edges()
        .iter()
        .filter(|e| e.target == id)
        .filter_map(|e| graph.node(&e.source))
        .collect()
}

/// Iterative DFS: each stack frame remembers the next edge index to scan, so
/// the visit order matches a recursive walk over edges in insertion order
/// without recursion depth tied to graph size.
fn walk<'g>(graph: &'g GraphStore, start: &str, direction: Direction) -> Vec<&'g Node> {
    let edges = graph.edges();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();

    let Some(start_node) = graph.node(start) else {
        return out;
    };
    visited.insert(start_node.id());

    let mut stack: Vec<(&str, usize)> = vec![(start_node.id(), 0)];

    while let Some(frame) = stack.last_mut() {
        let (current, cursor) = *frame;

        let next = edges[cursor..]
            .iter()
            .enumerate()
            .find(|(_, e)| direction.origin(e) == current);

        match next {
            Some((offset, edge)) => {
                frame.1 = cursor + offset + 1;
                let neighbour = direction.destination(edge);
                if let Some(node) = graph.node(neighbour) {
                    if visited.insert(node.id()) {
                        out.push(node);
                        stack.push((node.id(), 0));
                    }
                }
            }
            None => {
                stack.pop();
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::Position;
    use crate::types::NodeKind;

    fn graph_with(ids: &[&str], edges: &[(&str, &str)]) -> GraphStore {
        let mut graph = GraphStore::new();
        for id in ids {
            graph
                .insert_node(Node::new(
                    *id,
                    Position::default(),
                    crate::graph::node::NodeData::default_for(
                        NodeKind::RegionFilter,
                        "enrollments",
                    ),
                ))
                .unwrap();
        }
        for (s, t) in edges {
            graph.add_edge(s, t).unwrap();
        }
        graph
    }

    fn ids(nodes: Vec<&Node>) -> Vec<&str> {
        nodes.into_iter().map(|n| n.id()).collect()
    }

    #[test]
    fn downstream_follows_depth_first_edge_order() {
        let graph = graph_with(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "d"), ("b", "c"), ("d", "e")],
        );
        assert_eq!(ids(downstream_of(&graph, "a")), vec!["b", "c", "d", "e"]);
        assert_eq!(ids(downstream_of(&graph, "d")), vec!["e"]);
    }

    #[test]
    fn diamond_reports_shared_node_once() {
        let graph = graph_with(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert_eq!(ids(downstream_of(&graph, "a")), vec!["b", "d", "c"]);
        assert_eq!(ids(upstream_of(&graph, "d")), vec!["b", "a", "c"]);
    }

    #[test]
    fn cycles_terminate_and_exclude_the_start() {
        let graph = graph_with(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("b", "b")],
        );
        assert_eq!(ids(downstream_of(&graph, "a")), vec!["b", "c"]);
        assert_eq!(ids(upstream_of(&graph, "a")), vec!["c", "b"]);
    }

    #[test]
    fn unknown_start_yields_nothing() {
        let graph = graph_with(&["a"], &[]);
        assert!(downstream_of(&graph, "zzz").is_empty());
        assert!(upstream_of(&graph, "a").is_empty());
    }

    #[test]
    fn direct_upstream_is_one_hop() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        assert_eq!(ids(direct_upstream_of(&graph, "c")), vec!["b"]);
    }
}
