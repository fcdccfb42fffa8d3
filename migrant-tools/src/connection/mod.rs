use std::future::Future;
use futures::stream::BoxStream;
use crate::models::TypeDescriptor;
use crate::Result;

mod value;
mod numeric;
mod query;
mod postgres;
#[cfg(any(test, feature = "test_utilities"))]
mod memory;

pub use value::SqlValue;
pub use numeric::{Numeric, ParseNumericError};
pub use query::*;
pub use postgres::{PostgresClientWrapper, PostgresConnection, PostgresConnectionProvider, FromRow};
pub(crate) use postgres::{descriptor_for_type_name, FromPgChar, RowEnumExt};
#[cfg(any(test, feature = "test_utilities"))]
pub use memory::*;

pub type ResultRow = Vec<SqlValue>;

/// Metadata of one column of a result set.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResultColumn {
    pub name: String,
    pub descriptor: TypeDescriptor,
}

/// Rows are fetched forward only, as the stream is polled.
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: BoxStream<'static, Result<ResultRow>>,
}

/// Opens sessions on one database. Every dump task asks for its own session.
pub trait ConnectionProvider: Send + Sync + 'static {
    type Connection: Connection;

    fn open_connection(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// One database session.
pub trait Connection: Send + 'static {
    /// Runs a query, streaming its rows.
    fn query(&mut self, query: &Query) -> impl Future<Output = Result<ResultSet>> + Send;

    fn row_count(&mut self, query: &RowCountQuery) -> impl Future<Output = Result<u64>> + Send;

    /// Executes statements that don't return rows, such as DDL or session settings.
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<()>> + Send;

    /// Executes the insert once per row, returning the number of rows inserted.
    fn insert_rows(&mut self, insert: &InsertQuery, rows: &[Vec<SqlValue>]) -> impl Future<Output = Result<u64>> + Send;

    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;
}
