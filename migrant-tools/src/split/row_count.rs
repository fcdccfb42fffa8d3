use std::future::Future;
use tokio::sync::Mutex;
use crate::connection::{Connection, RowCountQuery};
use crate::Result;

/// A value computed on first access and read from memory afterwards.
///
/// Concurrent callers wait on the lock while the first one computes the value.
#[derive(Debug, Default)]
pub struct MemoizedValue<T> {
    value: Mutex<Option<T>>,
}

impl<T: Clone> MemoizedValue<T> {
    pub fn new() -> Self {
        MemoizedValue {
            value: Mutex::new(None),
        }
    }

    /// Returns the stored value, or runs `init` to compute it. `init` is not polled when
    /// a value exists.
    pub async fn get_or_try_init(&self, init: impl Future<Output = Result<T>>) -> Result<T> {
        let mut value = self.value.lock().await;
        if let Some(v) = value.as_ref() {
            return Ok(v.clone());
        }

        let computed = init.await?;
        *value = Some(computed.clone());
        Ok(computed)
    }
}

/// Counts the rows of one table scan, at most once.
#[derive(Debug)]
pub struct RowCountHandler {
    query: RowCountQuery,
    count: MemoizedValue<u64>,
}

impl RowCountHandler {
    pub fn new(query: RowCountQuery) -> Self {
        RowCountHandler {
            query,
            count: MemoizedValue::new(),
        }
    }

    pub fn query(&self) -> &RowCountQuery {
        &self.query
    }

    pub async fn row_count<C: Connection>(&self, connection: &mut C) -> Result<u64> {
        self.count
            .get_or_try_init(connection.row_count(&self.query))
            .await
    }
}
