use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pipegraph::store::{DataStore, QueryRequest, Row, SelectFuture, StoreError};

/// One scripted answer: wait `delay`, then return rows or an error message.
#[derive(Debug, Clone)]
struct Scripted {
    delay: Duration,
    response: Result<Vec<Row>, String>,
}

#[derive(Debug, Default)]
struct Inner {
    script: VecDeque<Scripted>,
    fallback: Vec<Row>,
    requests: Vec<QueryRequest>,
}

/// A fake data store that:
/// - records every request it receives
/// - answers from a script of delayed responses/failures, in call order
/// - falls back to a fixed set of rows (immediately) once the script runs out.
///
/// Clones share state, so a test can keep one clone for assertions and hand
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    inner: Arc<Mutex<Inner>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned whenever no scripted response is queued.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().fallback = rows;
        store
    }

    /// Queue a successful response delivered after `delay`.
    pub fn respond_after(&self, delay: Duration, rows: Vec<Row>) -> &Self {
        self.push(delay, Ok(rows))
    }

    /// Queue a failure delivered after `delay`.
    pub fn fail_after(&self, delay: Duration, message: &str) -> &Self {
        self.push(delay, Err(message.to_string()))
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    fn push(&self, delay: Duration, response: Result<Vec<Row>, String>) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .script
            .push_back(Scripted { delay, response });
        self
    }
}

impl DataStore for FakeStore {
    fn select(&self, request: QueryRequest) -> SelectFuture<'_> {
        let next = {
            let mut guard = self.inner.lock().unwrap();
            guard.requests.push(request);
            guard.script.pop_front().unwrap_or_else(|| Scripted {
                delay: Duration::ZERO,
                response: Ok(guard.fallback.clone()),
            })
        };

        Box::pin(async move {
            if !next.delay.is_zero() {
                tokio::time::sleep(next.delay).await;
            }
            next.response.map_err(StoreError::new)
        })
    }
}
