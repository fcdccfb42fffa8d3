use std::fmt::Display;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Row, Statement};
use tokio_postgres::row::RowIndex;
use tokio_postgres::types::{FromSqlOwned, ToSql};
use crate::{MigrantToolsError, Result};

mod connection;
mod numeric;
mod values;

pub use connection::{PostgresConnection, PostgresConnectionProvider};
pub(crate) use values::{descriptor_for_type_name, read_value};

pub struct PostgresClientWrapper {
    client: Client,
    join_handle: JoinHandle<Result<()>>,
    version: i32,
}

impl PostgresClientWrapper {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let (client, connection) =
            tokio_postgres::connect(connection_string, NoTls).await?;

        // The connection object performs the actual communication with the database,
        // so spawn it off to run on its own.
        let join_handle = tokio::spawn(async move {
            match connection.await {
                Err(e) => Err(MigrantToolsError::PostgresError(e)),
                Ok(_) => Ok(())
            }
        });

        let version = match client.simple_query("SHOW server_version_num;").await?.first() {
            Some(tokio_postgres::SimpleQueryMessage::Row(row)) => {
                let version: i32 = row.get(0)
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| MigrantToolsError::DatabaseAccess("server did not report a usable version".to_string()))?;
                version / 10000
            }
            _ => return Err(MigrantToolsError::DatabaseAccess("server did not report its version".to_string()))
        };

        Ok(PostgresClientWrapper {
            client,
            join_handle,
            version
        })
    }

    pub async fn execute_non_query(&self, sql: &str) -> Result {
        self.client.batch_execute(sql).await.map_err(|e| MigrantToolsError::PostgresErrorWithQuery {
            source: e,
            query: sql.to_string(),
        })?;

        Ok(())
    }

    pub async fn get_results<T: FromRow>(&self, sql: &str) -> Result<Vec<T>> {

        let query_results = self.client.query(sql, &[]).await.map_err(|e| MigrantToolsError::PostgresErrorWithQuery {
            source: e,
            query: sql.to_string(),
        })?;

        let mut output = Vec::with_capacity(query_results.len());

        for row in query_results.into_iter() {
            output.push(T::from_row(row)?);
        }

        Ok(output)
    }

    pub async fn get_result<T: FromRow>(&self, sql: &str) -> Result<T> {
        let mut results = self.get_results(sql).await?;
        if results.len() != 1 {
            return Err(MigrantToolsError::InvalidNumberOfResults {
                actual: results.len(),
                expected: 1,
            });
        }

        results.pop().ok_or(MigrantToolsError::InvalidNumberOfResults {
            actual: 0,
            expected: 1,
        })
    }

    pub async fn get_single_results<T: FromSqlOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let r = self.get_results::<(T,)>(sql).await?.into_iter()
            .map(|t| t.0)
            .collect();

        Ok(r)
    }

    pub async fn get_single_result<T: FromSqlOwned>(&self, sql: &str) -> Result<T> {
        let result = self.get_result::<(T,)>(sql).await?;
        Ok(result.0)
    }

    pub async fn prepare(&self, sql: &str) -> Result<Statement> {
        self.client.prepare(sql).await.map_err(|e| MigrantToolsError::PostgresErrorWithQuery {
            source: e,
            query: sql.to_string(),
        })
    }

    pub async fn execute_statement(&self, statement: &Statement, params: &[&(dyn ToSql + Sync)]) -> std::result::Result<u64, tokio_postgres::Error> {
        self.client.execute(statement, params).await
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Major version of the server.
    pub fn version(&self) -> i32 {
        self.version
    }
}

impl Drop for PostgresClientWrapper {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self>;
}

impl<T1: FromSqlOwned> FromRow for (T1,) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((
            row.try_get(0)?,
        ))
    }
}

impl<T1: FromSqlOwned, T2: FromSqlOwned> FromRow for (T1, T2) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((
            row.try_get(0)?,
            row.try_get(1)?,
        ))
    }
}

impl<T1: FromSqlOwned, T2: FromSqlOwned, T3: FromSqlOwned> FromRow for (T1, T2, T3) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((
            row.try_get(0)?,
            row.try_get(1)?,
            row.try_get(2)?,
        ))
    }
}

pub(crate) trait FromPgChar: Sized {
    fn from_pg_char(c: char) -> Result<Self>;
}

pub(crate) trait RowEnumExt {
    fn try_get_enum_value<T: FromPgChar, I: RowIndex + Display>(&self, idx: I) -> Result<T>;
}

impl RowEnumExt for Row {
    fn try_get_enum_value<T: FromPgChar, I: RowIndex + Display>(&self, idx: I) -> Result<T> {
        let value: i8 = self.try_get(idx)?;
        let c = value as u8 as char;
        T::from_pg_char(c)
    }
}
