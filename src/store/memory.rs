// src/store/memory.rs

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::{PipegraphError, Result};
use crate::store::backend::{DataStore, Projection, QueryRequest, Row, SelectFuture, StoreError};

/// A single named table held in memory.
///
/// Filtering compares string cells directly and numeric/boolean cells by
/// their textual form, so `pincode = "751001"` matches both `"751001"` and
/// `751001`.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    name: String,
    rows: Vec<Row>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Load rows from a JSON file containing an array of objects.
    pub fn from_json_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents)?;

        let Value::Array(items) = value else {
            return Err(PipegraphError::ConfigError(format!(
                "data file {path:?} must contain a JSON array of objects"
            )));
        };

        let rows = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(PipegraphError::ConfigError(format!(
                    "data file {path:?}: element {i} is not an object ({other})"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = rows.len(), ?path, "loaded table rows");
        Ok(Self::new(name, rows))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Synchronous core of [`DataStore::select`].
    pub fn query(&self, request: &QueryRequest) -> std::result::Result<Vec<Row>, StoreError> {
        if request.table != self.name {
            return Err(StoreError::new(format!(
                "relation \"{}\" does not exist",
                request.table
            )));
        }

        let rows = self
            .rows
            .iter()
            .filter(|row| {
                request
                    .filters
                    .iter()
                    .all(|(column, value)| cell_matches(row.get(column), value))
            })
            .take(request.limit)
            .map(|row| project(row, &request.projection))
            .collect();

        Ok(rows)
    }
}

impl DataStore for MemoryTable {
    fn select(&self, request: QueryRequest) -> SelectFuture<'_> {
        Box::pin(async move { self.query(&request) })
    }
}

fn cell_matches(cell: Option<&Value>, wanted: &str) -> bool {
    match cell {
        Some(Value::String(s)) => s == wanted,
        Some(Value::Number(n)) => n.to_string() == wanted,
        Some(Value::Bool(b)) => b.to_string() == wanted,
        _ => false,
    }
}

fn project(row: &Row, projection: &Projection) -> Row {
    match projection {
        Projection::All => row.clone(),
        Projection::Columns(cols) => cols
            .iter()
            .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
            .collect(),
    }
}
