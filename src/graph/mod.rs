// src/graph/mod.rs

//! The mutable pipeline graph.
//!
//! - [`node`] defines nodes and the closed set of kind-specific payloads.
//! - [`store`] holds the node and edge collections.
//! - [`traversal`] computes cycle-safe upstream/downstream reachability.

pub mod node;
pub mod store;
pub mod traversal;

pub use node::{Node, NodeData, NodeId, Position};
pub use store::{Edge, GraphStore};
pub use traversal::{direct_upstream_of, downstream_of, upstream_of};
