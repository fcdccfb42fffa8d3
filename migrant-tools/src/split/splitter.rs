use std::sync::Arc;
use tracing::debug;
use crate::connection::{Connection, Query, SelectQuery};
use crate::split::RowCountHandler;
use crate::{MigrantToolsError, Result};

/// One bounded part of a query's result set.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct QuerySplit {
    pub query: Query,
    /// Position of the split, starting at 0.
    pub index: usize,
    pub has_next: bool,
    /// Rows are fetched as they are consumed instead of being buffered up front.
    pub stream_results: bool,
}

/// How many rows a single split should cover.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct QueryLimit {
    pub row_count_per_split: u64,
}

impl QueryLimit {
    pub fn new(row_count_per_split: u64) -> Self {
        QueryLimit {
            row_count_per_split: row_count_per_split.max(1),
        }
    }
}

/// Produces the splits of one query in a fixed order.
///
/// The splits never overlap and together return every row exactly once, so they can be
/// extracted in parallel.
#[derive(Debug)]
pub enum QuerySplitter {
    /// The whole query is one split.
    NoLimit {
        query: Query,
        done: bool,
    },
    /// Pages of `limit` rows, until the row count is covered. The last page is open ended,
    /// so rows added after counting, or missed by an estimate, are still returned.
    Limit {
        query: SelectQuery,
        limit: QueryLimit,
        row_count: Arc<RowCountHandler>,
        index: usize,
        done: bool,
    },
}

impl QuerySplitter {
    pub fn no_limit(query: Query) -> Self {
        QuerySplitter::NoLimit { query, done: false }
    }

    /// The query must be ordered on unique columns for pages to be stable.
    pub fn limit(query: SelectQuery, limit: QueryLimit, row_count: Arc<RowCountHandler>) -> Self {
        QuerySplitter::Limit {
            query,
            limit,
            row_count,
            index: 0,
            done: false,
        }
    }

    pub async fn has_next_split<C: Connection>(&self, connection: &mut C) -> Result<bool> {
        match self {
            QuerySplitter::NoLimit { done, .. } => Ok(!done),
            QuerySplitter::Limit { done: true, .. } => Ok(false),
            QuerySplitter::Limit { index: 0, .. } => Ok(true),
            QuerySplitter::Limit { limit, row_count, index, .. } => {
                let total = row_count.row_count(connection).await?;
                Ok((*index as u64) * limit.row_count_per_split < total)
            }
        }
    }

    /// Produces the next split, letting the hook adjust it before it is handed out.
    pub async fn next_split<C: Connection>(&mut self, connection: &mut C, before_split: impl FnOnce(&mut QuerySplit)) -> Result<QuerySplit> {
        if !self.has_next_split(connection).await? {
            return Err(MigrantToolsError::SplitterExhaustion);
        }

        let mut split = match self {
            QuerySplitter::NoLimit { query, done } => {
                *done = true;
                QuerySplit {
                    query: query.clone(),
                    index: 0,
                    has_next: false,
                    stream_results: true,
                }
            }
            QuerySplitter::Limit { query, limit, row_count, index, done } => {
                let total = row_count.row_count(connection).await?;
                let page = limit.row_count_per_split;
                let offset = (*index as u64) * page;
                let has_next = offset + page < total;

                let mut select = query.clone();
                select.offset = offset;
                select.limit = if has_next { Some(page) } else { None };

                let split = QuerySplit {
                    query: Query::Select(select),
                    index: *index,
                    has_next,
                    stream_results: true,
                };

                *index += 1;
                *done = !has_next;
                split
            }
        };

        before_split(&mut split);
        debug!("Produced split {} of {:?}, more: {}", split.index, split.query, split.has_next);
        Ok(split)
    }
}
