use std::collections::HashMap;
use std::sync::Arc;
use futures::StreamExt;
use tokio_postgres::Statement;
use tokio_postgres::types::ToSql;
use tracing::{debug, instrument};
use crate::connection::postgres::{descriptor_for_type_name, read_value, PostgresClientWrapper};
use crate::connection::{Connection, ConnectionProvider, InsertQuery, Query, ResultColumn, ResultSet, RowCountQuery, SqlValue};
use crate::dialect::{Dialect, PostgresDialect};
use crate::{MigrantToolsError, Result};

/// Opens a new Postgres session for every request.
#[derive(Debug, Clone)]
pub struct PostgresConnectionProvider {
    connection_string: String,
    dialect: Arc<PostgresDialect>,
}

impl PostgresConnectionProvider {
    pub fn new(connection_string: impl Into<String>, dialect: Arc<PostgresDialect>) -> Self {
        PostgresConnectionProvider {
            connection_string: connection_string.into(),
            dialect,
        }
    }

    pub fn dialect(&self) -> Arc<PostgresDialect> {
        self.dialect.clone()
    }
}

impl ConnectionProvider for PostgresConnectionProvider {
    type Connection = PostgresConnection;

    async fn open_connection(&self) -> Result<PostgresConnection> {
        let client = PostgresClientWrapper::new(&self.connection_string).await?;
        Ok(PostgresConnection::new(client, self.dialect.clone()))
    }
}

pub struct PostgresConnection {
    client: PostgresClientWrapper,
    dialect: Arc<PostgresDialect>,
    statements: HashMap<String, Statement>,
}

impl PostgresConnection {
    pub fn new(client: PostgresClientWrapper, dialect: Arc<PostgresDialect>) -> Self {
        PostgresConnection {
            client,
            dialect,
            statements: HashMap::new(),
        }
    }

    pub fn client(&self) -> &PostgresClientWrapper {
        &self.client
    }

    async fn statement(&mut self, sql: &str) -> Result<Statement> {
        if let Some(statement) = self.statements.get(sql) {
            return Ok(statement.clone());
        }

        let statement = self.client.prepare(sql).await?;
        self.statements.insert(sql.to_string(), statement.clone());
        Ok(statement)
    }
}

impl Connection for PostgresConnection {
    #[instrument(skip_all)]
    async fn query(&mut self, query: &Query) -> Result<ResultSet> {
        let sql = query.to_sql(self.dialect.as_ref())?;
        debug!("Running query {}", sql);

        let statement = self.client.prepare(&sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| ResultColumn {
                name: c.name().to_string(),
                descriptor: descriptor_for_type_name(c.type_().name()),
            })
            .collect();

        let rows = self
            .client
            .client()
            .query_raw(&statement, std::iter::empty::<String>())
            .await
            .map_err(|e| MigrantToolsError::PostgresErrorWithQuery {
                source: e,
                query: sql.clone(),
            })?;

        let rows = rows
            .map(|row| {
                let row = row?;
                (0..row.len()).map(|idx| read_value(&row, idx)).collect::<Result<Vec<_>>>()
            })
            .boxed();

        Ok(ResultSet { columns, rows })
    }

    async fn row_count(&mut self, query: &RowCountQuery) -> Result<u64> {
        let sql = self.dialect.row_count_sql(query);
        debug!("Counting rows with {}", sql);
        let count: i64 = self.client.get_single_result(&sql).await?;
        Ok(count.max(0) as u64)
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.client.execute_non_query(sql).await
    }

    async fn insert_rows(&mut self, insert: &InsertQuery, rows: &[Vec<SqlValue>]) -> Result<u64> {
        let sql = insert.to_sql(self.dialect.as_ref());
        let statement = self.statement(&sql).await?;

        let mut inserted = 0;
        for row in rows {
            let params: Vec<&(dyn ToSql + Sync)> = row.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
            inserted += self
                .client
                .execute_statement(&statement, &params)
                .await
                .map_err(|e| MigrantToolsError::PostgresErrorWithQuery {
                    source: e,
                    query: sql.clone(),
                })?;
        }

        Ok(inserted)
    }

    async fn begin(&mut self) -> Result<()> {
        self.client.execute_non_query("begin").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.client.execute_non_query("commit").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.client.execute_non_query("rollback").await
    }
}
