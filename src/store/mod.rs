// src/store/mod.rs

//! Query execution against the external tabular data source.
//!
//! - [`backend`] defines the `DataStore` trait and request/row types.
//! - [`memory`] provides an in-process `MemoryTable` store.
//! - [`executor`] builds requests from a query specification, applies the
//!   row cap and request timeout, and wraps rows in a `QueryResult`.

pub mod backend;
pub mod executor;
pub mod memory;

pub use backend::{DataStore, Projection, QueryRequest, Row, SelectFuture, StoreError};
pub use executor::{DEFAULT_QUERY_TIMEOUT, DEFAULT_ROW_LIMIT, QueryExecutor, QueryResult};
pub use memory::MemoryTable;
