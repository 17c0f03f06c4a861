// src/store/backend.rs

//! Pluggable data-store abstraction.
//!
//! The engine never talks to a concrete database. It hands a
//! [`QueryRequest`] (equality filters, a column projection and a row limit
//! over one table) to a [`DataStore`] and gets rows or a [`StoreError`] back.
//!
//! - [`crate::store::MemoryTable`] is the in-process implementation used by
//!   the CLI.
//! - Tests provide scripted stores that delay, fail, or record requests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// One record returned by the data store.
pub type Row = Map<String, Value>;

/// Boxed future returned by [`DataStore::select`].
pub type SelectFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Row>, StoreError>> + Send + 'a>>;

/// Columns to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Projection {
    /// Every column (`*`).
    All,
    Columns(Vec<String>),
}

impl Projection {
    /// Render as a select clause, e.g. `*` or `state, district, age_0_5`.
    pub fn to_select_clause(&self) -> String {
        match self {
            Projection::All => "*".to_string(),
            Projection::Columns(cols) => cols.join(", "),
        }
    }
}

/// A concrete request against a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub table: String,
    pub projection: Projection,
    /// `(column, value)` equality predicates, all of which must hold.
    pub filters: Vec<(String, String)>,
    pub limit: usize,
}

/// Failure reported by the data store; the message is surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Trait abstracting the external tabular data source.
pub trait DataStore: Send + Sync {
    /// Execute `request` and return the matching rows.
    fn select(&self, request: QueryRequest) -> SelectFuture<'_>;
}

impl<T: DataStore + ?Sized> DataStore for Arc<T> {
    fn select(&self, request: QueryRequest) -> SelectFuture<'_> {
        (**self).select(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_clause_rendering() {
        assert_eq!(Projection::All.to_select_clause(), "*");
        let cols = Projection::Columns(vec!["state".into(), "age_0_5".into()]);
        assert_eq!(cols.to_select_clause(), "state, age_0_5");
    }
}
