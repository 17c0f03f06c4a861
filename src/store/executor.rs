// src/store/executor.rs

//! Turns a [`QuerySpecification`] into a data-store request and runs it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::QueryError;
use crate::pipeline::collector::{Filters, QuerySpecification};
use crate::store::backend::{DataStore, Projection, QueryRequest, Row};
use crate::types::FilterKey;

/// Fixed result cap applied to every request.
pub const DEFAULT_ROW_LIMIT: usize = 100;

/// Default per-request timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Envelope written once per successful execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Dispatch sequence number of the run that produced this result.
    pub sequence: u64,
    pub rows: Vec<Row>,
    pub filters: Filters,
    pub columns: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Builds requests from specifications and executes them with a timeout.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn DataStore>,
    row_limit: usize,
    timeout: Duration,
}

impl fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("row_limit", &self.row_limit)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            row_limit: DEFAULT_ROW_LIMIT,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Build the concrete request for `spec`.
    ///
    /// The projection always includes the three region columns ahead of the
    /// selected ones; an empty selection means every column.
    pub fn build_request(&self, spec: &QuerySpecification) -> Result<QueryRequest, QueryError> {
        if !spec.has_source {
            return Err(QueryError::NoSourceConnected);
        }

        let projection = if spec.columns.is_empty() {
            Projection::All
        } else {
            let mut cols: Vec<String> = FilterKey::ALL
                .iter()
                .map(|k| k.column().to_string())
                .collect();
            for column in &spec.columns {
                if !cols.contains(column) {
                    cols.push(column.clone());
                }
            }
            Projection::Columns(cols)
        };

        let filters = spec
            .filters
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.column().to_string(), value.clone()))
            .collect();

        Ok(QueryRequest {
            table: spec.table.clone(),
            projection,
            filters,
            limit: self.row_limit,
        })
    }

    /// Run `request` against the store, bounded by the configured timeout.
    pub async fn fetch(&self, request: QueryRequest) -> Result<Vec<Row>, QueryError> {
        debug!(
            table = %request.table,
            select = %request.projection.to_select_clause(),
            filters = ?request.filters,
            limit = request.limit,
            "executing query"
        );

        let limit = request.limit;
        let outcome = tokio::time::timeout(self.timeout, self.store.select(request)).await;

        match outcome {
            Ok(Ok(mut rows)) => {
                if rows.len() > limit {
                    warn!(
                        returned = rows.len(),
                        limit, "data store ignored the row limit; truncating"
                    );
                    rows.truncate(limit);
                }
                Ok(rows)
            }
            Ok(Err(err)) => Err(QueryError::Execution(err.message)),
            Err(_elapsed) => Err(QueryError::Timeout(self.timeout)),
        }
    }

    /// Build and run the request for `spec`, wrapping the rows in a
    /// [`QueryResult`] stamped with `sequence`.
    pub async fn execute(
        &self,
        sequence: u64,
        spec: &QuerySpecification,
    ) -> Result<QueryResult, QueryError> {
        let request = self.build_request(spec)?;
        let rows = self.fetch(request).await?;
        Ok(QueryResult {
            sequence,
            rows,
            filters: spec.filters.clone(),
            columns: spec.columns.clone(),
            timestamp: Utc::now(),
        })
    }
}
