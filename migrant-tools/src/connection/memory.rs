use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use futures::StreamExt;
use crate::connection::{Connection, ConnectionProvider, InsertQuery, Query, ResultColumn, ResultRow, ResultSet, RowCountMode, RowCountQuery, SelectQuery, SqlValue};
use crate::models::{Database, HasTables, Table, TableRef};
use crate::{MigrantToolsError, Result};

type QueryPredicate = Arc<dyn Fn(&SelectQuery) -> bool + Send + Sync>;
type RowPredicate = Arc<dyn Fn(&[SqlValue]) -> bool + Send + Sync>;
type StatementPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// An in-memory database that understands the structured queries of this crate.
///
/// Cloning gives another handle on the same data, so a test can keep one handle to
/// inspect what a dump or load did with the other.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    tables: Vec<MemoryTable>,
    native_queries: HashMap<String, (Vec<ResultColumn>, Vec<ResultRow>)>,
    approximate_counts: HashMap<TableRef, u64>,
    executed: Vec<String>,
    commits: usize,
    rollbacks: usize,
    connections_opened: usize,
    queries_started: usize,
    queries_finished: usize,
    row_count_queries: usize,
    query_delay: Option<Duration>,
    failing_queries: Vec<QueryPredicate>,
    failing_rows: Vec<RowPredicate>,
    failing_statements: Vec<StatementPredicate>,
}

struct MemoryTable {
    table: Table,
    rows: Vec<ResultRow>,
    next_identity: i64,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table for every table of the model.
    pub fn from_model(database: &Database) -> Self {
        let db = Self::new();
        for table in database.tables() {
            db.add_table(table.clone(), Vec::new());
        }
        db
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the data from the remaining assertions.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_table(&self, table: Table, rows: Vec<ResultRow>) {
        let mut state = self.state();
        state.tables.retain(|t| t.table.table_ref() != table.table_ref());
        let next_identity = rows.len() as i64 + 1;
        state.tables.push(MemoryTable {
            table,
            rows,
            next_identity,
        });
    }

    pub fn register_native_query(&self, sql: &str, columns: Vec<ResultColumn>, rows: Vec<ResultRow>) {
        self.state().native_queries.insert(sql.to_string(), (columns, rows));
    }

    /// The estimate returned for approximate row counts. Exact counts are used otherwise.
    pub fn set_approximate_row_count(&self, table: TableRef, count: u64) {
        self.state().approximate_counts.insert(table, count);
    }

    pub fn set_query_delay(&self, delay: Duration) {
        self.state().query_delay = Some(delay);
    }

    pub fn fail_queries_where(&self, predicate: impl Fn(&SelectQuery) -> bool + Send + Sync + 'static) {
        self.state().failing_queries.push(Arc::new(predicate));
    }

    pub fn fail_inserts_where(&self, predicate: impl Fn(&[SqlValue]) -> bool + Send + Sync + 'static) {
        self.state().failing_rows.push(Arc::new(predicate));
    }

    pub fn fail_statements_where(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        self.state().failing_statements.push(Arc::new(predicate));
    }

    pub fn rows(&self, table: &str) -> Vec<ResultRow> {
        let table_ref = TableRef::parse(table);
        self.state()
            .tables
            .iter()
            .find(|t| t.table.table_ref().matches(&table_ref))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn executed_statements(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    pub fn commits(&self) -> usize {
        self.state().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state().rollbacks
    }

    pub fn connections_opened(&self) -> usize {
        self.state().connections_opened
    }

    pub fn queries_started(&self) -> usize {
        self.state().queries_started
    }

    pub fn queries_finished(&self) -> usize {
        self.state().queries_finished
    }

    pub fn row_count_queries(&self) -> usize {
        self.state().row_count_queries
    }

    fn select(&self, select: &SelectQuery) -> Result<ResultSet> {
        let state = self.state();

        if state.failing_queries.iter().any(|p| p(select)) {
            return Err(MigrantToolsError::DatabaseAccess(format!("query on {} failed", select.table)));
        }

        if select.filter.is_some() {
            return Err(MigrantToolsError::DatabaseAccess("filters are not supported in memory".to_string()));
        }

        let table = find_table(&state.tables, &select.table)?;

        let indexes = if select.columns.is_empty() {
            (0..table.table.columns.len()).collect::<Vec<_>>()
        } else {
            select
                .columns
                .iter()
                .map(|name| {
                    table
                        .table
                        .columns
                        .iter()
                        .position(|c| &c.name == name)
                        .ok_or_else(|| MigrantToolsError::ColumnNotFound {
                            table: table.table.name.to_string(),
                            column: name.to_string(),
                        })
                })
                .collect::<Result<Vec<_>>>()?
        };

        let order = select
            .order_by
            .iter()
            .map(|name| {
                table
                    .table
                    .columns
                    .iter()
                    .position(|c| &c.name == name)
                    .ok_or_else(|| MigrantToolsError::ColumnNotFound {
                        table: table.table.name.to_string(),
                        column: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut rows = table.rows.clone();
        if !order.is_empty() {
            rows.sort_by(|a, b| {
                order
                    .iter()
                    .map(|&i| compare_values(&a[i], &b[i]))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let limit = select.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let rows = rows
            .into_iter()
            .skip(select.offset as usize)
            .take(limit)
            .map(|row| Ok(indexes.iter().map(|&i| row[i].clone()).collect()))
            .collect::<Vec<Result<ResultRow>>>();

        let columns = indexes
            .iter()
            .map(|&i| {
                let column = &table.table.columns[i];
                ResultColumn {
                    name: column.name.value().to_string(),
                    descriptor: column.data_type.clone(),
                }
            })
            .collect();

        Ok(ResultSet {
            columns,
            rows: futures::stream::iter(rows).boxed(),
        })
    }
}

fn find_table<'a>(tables: &'a [MemoryTable], table_ref: &TableRef) -> Result<&'a MemoryTable> {
    tables
        .iter()
        .find(|t| t.table.table_ref().matches(table_ref))
        .ok_or_else(|| MigrantToolsError::TableNotFound(table_ref.to_string()))
}

fn rank(value: &SqlValue) -> u8 {
    match value {
        SqlValue::Null => 0,
        SqlValue::Bool(_) => 1,
        SqlValue::SmallInt(_) | SqlValue::Int(_) | SqlValue::BigInt(_) => 2,
        SqlValue::Real(_) | SqlValue::Double(_) | SqlValue::Numeric(_) => 3,
        SqlValue::Text(_) => 4,
        SqlValue::Bytes(_) => 5,
        SqlValue::Date(_) => 6,
        SqlValue::Time(_) => 7,
        SqlValue::Timestamp(_) => 8,
        SqlValue::TimestampTz(_) => 9,
        SqlValue::Uuid(_) => 10,
        SqlValue::Json(_) => 11,
    }
}

fn compare_values(a: &SqlValue, b: &SqlValue) -> Ordering {
    match (a, b) {
        (SqlValue::Bool(a), SqlValue::Bool(b)) => a.cmp(b),
        (SqlValue::Real(a), SqlValue::Real(b)) => a.cmp(b),
        (SqlValue::Double(a), SqlValue::Double(b)) => a.cmp(b),
        (SqlValue::Numeric(a), SqlValue::Numeric(b)) => a.cmp(b),
        (SqlValue::Text(a), SqlValue::Text(b)) => a.cmp(b),
        (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a.cmp(b),
        (SqlValue::Date(a), SqlValue::Date(b)) => a.cmp(b),
        (SqlValue::Time(a), SqlValue::Time(b)) => a.cmp(b),
        (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a.cmp(b),
        (SqlValue::TimestampTz(a), SqlValue::TimestampTz(b)) => a.cmp(b),
        (SqlValue::Uuid(a), SqlValue::Uuid(b)) => a.cmp(b),
        (SqlValue::Json(a), SqlValue::Json(b)) => a.to_string().cmp(&b.to_string()),
        _ => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

impl ConnectionProvider for MemoryDatabase {
    type Connection = MemoryConnection;

    async fn open_connection(&self) -> Result<MemoryConnection> {
        self.state().connections_opened += 1;
        Ok(MemoryConnection { db: self.clone() })
    }
}

pub struct MemoryConnection {
    db: MemoryDatabase,
}

impl Connection for MemoryConnection {
    async fn query(&mut self, query: &Query) -> Result<ResultSet> {
        let delay = {
            let mut state = self.db.state();
            state.queries_started += 1;
            state.query_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match query {
            Query::Select(select) => self.db.select(select),
            Query::Native(sql) => self
                .db
                .state()
                .native_queries
                .get(sql)
                .cloned()
                .map(|(columns, rows)| ResultSet {
                    columns,
                    rows: futures::stream::iter(rows.into_iter().map(Ok)).boxed(),
                })
                .ok_or_else(|| MigrantToolsError::DatabaseAccess(format!("unknown query `{}`", sql))),
        };

        self.db.state().queries_finished += 1;
        result
    }

    async fn row_count(&mut self, query: &RowCountQuery) -> Result<u64> {
        let mut state = self.db.state();
        state.row_count_queries += 1;

        if query.mode == RowCountMode::Approximate {
            if let Some(count) = state.approximate_counts.iter().find(|(t, _)| t.matches(&query.table)).map(|(_, c)| *c) {
                return Ok(count);
            }
        }

        if query.filter.is_some() {
            return Err(MigrantToolsError::DatabaseAccess("filters are not supported in memory".to_string()));
        }

        Ok(find_table(&state.tables, &query.table)?.rows.len() as u64)
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.db.state();
        if state.failing_statements.iter().any(|p| p(sql)) {
            return Err(MigrantToolsError::DatabaseAccess(format!("statement failed: {}", sql)));
        }
        state.executed.push(sql.to_string());
        Ok(())
    }

    async fn insert_rows(&mut self, insert: &InsertQuery, rows: &[Vec<SqlValue>]) -> Result<u64> {
        let mut state = self.db.state();
        let failing_rows = state.failing_rows.clone();

        let table = state
            .tables
            .iter_mut()
            .find(|t| t.table.table_ref().matches(&insert.table))
            .ok_or_else(|| MigrantToolsError::TableNotFound(insert.table.to_string()))?;

        for row in rows {
            if failing_rows.iter().any(|p| p(row)) {
                return Err(MigrantToolsError::DatabaseAccess(format!("insert into {} failed", insert.table)));
            }

            let mut full_row = Vec::with_capacity(table.table.columns.len());
            for column in &table.table.columns {
                let value = match insert.columns.iter().position(|c| c == &column.name) {
                    Some(idx) => row.get(idx).cloned().unwrap_or(SqlValue::Null),
                    None if column.auto_increment => {
                        let next = table.next_identity;
                        table.next_identity += 1;
                        SqlValue::BigInt(next)
                    }
                    None => column
                        .default_value
                        .as_ref()
                        .map(|d| SqlValue::Text(d.clone()))
                        .unwrap_or(SqlValue::Null),
                };

                if value.is_null() && !column.is_nullable {
                    return Err(MigrantToolsError::DatabaseAccess(format!(
                        "null value in column {} of {} violates not-null constraint",
                        column.name, insert.table
                    )));
                }

                full_row.push(value);
            }

            table.rows.push(full_row);
        }

        Ok(rows.len() as u64)
    }

    async fn begin(&mut self) -> Result<()> {
        self.db.state().executed.push("begin".to_string());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.db.state().commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.db.state().rollbacks += 1;
        Ok(())
    }
}
