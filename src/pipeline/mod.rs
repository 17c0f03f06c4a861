// src/pipeline/mod.rs

//! Pure pipeline semantics over a graph snapshot.
//!
//! - [`columns`] maps display labels to physical columns.
//! - [`collector`] derives the query specification from the graph.
//! - [`signal`] evaluates logic-processor thresholds over fetched rows.
//! - [`propagate`] writes a query result into consumer nodes.

pub mod collector;
pub mod columns;
pub mod propagate;
pub mod signal;

pub use collector::{Filters, QuerySpecification, collect_pipeline_config};
pub use propagate::{mark_loading, propagate};
pub use signal::evaluate;
