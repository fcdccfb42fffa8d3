use thiserror::Error;
use crate::models::TypeDescriptor;

#[derive(Error, Debug)]
pub enum MigrantToolsError {
    #[error("Error from postgres: `{0}`")]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Error from postgres: `{query}` when executing query: `{source}`")]
    PostgresErrorWithQuery {
        query: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("Database access failed: {0}")]
    DatabaseAccess(String),

    #[error("Invalid number of results returned from query. Expected `{expected}`, got `{actual}`")]
    InvalidNumberOfResults {
        actual: usize,
        expected: usize,
    },

    #[error("No codec is registered for type {0}")]
    UnsupportedType(TypeDescriptor),

    #[error("Column `{column}` does not exist in table `{table}`")]
    ColumnNotFound {
        table: String,
        column: String,
    },

    #[error("Table `{0}` does not exist in the target database")]
    TableNotFound(String),

    #[error("Unknown {kind} '{value}'")]
    UnknownCatalogValue {
        kind: &'static str,
        value: String,
    },

    #[error("Query splitter has no more splits to produce")]
    SplitterExhaustion,

    #[error("Dialect `{dialect}` does not support {capability}")]
    DialectCapability {
        dialect: String,
        capability: String,
    },

    #[error("Value `{value}` is not a valid {descriptor}: {reason}")]
    InvalidValue {
        descriptor: TypeDescriptor,
        value: String,
        reason: String,
    },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("io error: `{0}`")]
    IoError(#[from] std::io::Error),

    #[error("json error: `{0}`")]
    JsonError(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    TaskFailed(String),

    #[error("The job was stopped before it finished")]
    Cancelled,
}

impl From<tokio::task::JoinError> for MigrantToolsError {
    fn from(value: tokio::task::JoinError) -> Self {
        MigrantToolsError::TaskFailed(value.to_string())
    }
}

pub type Result<T = ()> = std::result::Result<T, MigrantToolsError>;
