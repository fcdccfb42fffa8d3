use std::fmt::Debug;
use time::UtcOffset;
use crate::connection::{RowCountMode, RowCountQuery};
use crate::models::{Column, Identifier, TableRef, TypeDescriptor};
use crate::quoting::{AttemptedKeywordUsage, IdentifierQuoter};
use crate::split::RowCountHandler;
use crate::{MigrantToolsError, Result};

mod type_names;
mod postgres;
mod mysql;
mod generic;

pub use type_names::TypeNameMap;
pub use postgres::PostgresDialect;
pub use mysql::MySqlDialect;
pub use generic::GenericDialect;

/// Feature flags of an engine, probed by callers instead of checking which engine they talk to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Capabilities {
    pub sequences: bool,
    pub index_in_create_table: bool,
    pub drop_constraints: bool,
    pub session_time_zone: bool,
    pub with_time_zone: bool,
    pub limit_offset: bool,
    pub if_exists: bool,
    pub catalogs: bool,
    pub schemas: bool,
    pub approximate_row_count: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            sequences: true,
            index_in_create_table: false,
            drop_constraints: true,
            session_time_zone: false,
            with_time_zone: true,
            limit_offset: true,
            if_exists: false,
            catalogs: false,
            schemas: true,
            approximate_row_count: false,
        }
    }
}

/// Everything the engine needs to know about one kind of database.
pub trait Dialect: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn capabilities(&self) -> &Capabilities;

    fn quoter(&self) -> &IdentifierQuoter;

    fn type_names(&self) -> &TypeNameMap;

    /// Maps an engine specific type to the descriptor codecs are registered under.
    fn resolve_type_alias(&self, _descriptor: &TypeDescriptor) -> Option<TypeDescriptor> {
        None
    }

    fn supports_sequence(&self) -> bool {
        self.capabilities().sequences
    }

    fn supports_index_in_create_table(&self) -> bool {
        self.capabilities().index_in_create_table
    }

    fn supports_drop_constraints(&self) -> bool {
        self.capabilities().drop_constraints
    }

    fn supports_session_time_zone(&self) -> bool {
        self.capabilities().session_time_zone
    }

    fn supports_with_time_zone(&self) -> bool {
        self.capabilities().with_time_zone
    }

    fn supports_limit_offset(&self) -> bool {
        self.capabilities().limit_offset
    }

    fn supports_if_exists(&self) -> bool {
        self.capabilities().if_exists
    }

    fn quote(&self, identifier: &str) -> String {
        self.quoter().quote(identifier, AttemptedKeywordUsage::Other)
    }

    fn quote_column(&self, identifier: &str) -> String {
        self.quoter().quote(identifier, AttemptedKeywordUsage::ColumnName)
    }

    /// Qualifies a name with the parts this engine understands.
    fn qualify_name(&self, catalog: Option<&Identifier>, schema: Option<&Identifier>, name: &str) -> String {
        let mut sql = String::new();
        if let (true, Some(catalog)) = (self.capabilities().catalogs, catalog) {
            sql.push_str(&self.quote(catalog.value()));
            sql.push('.');
        }
        if let (true, Some(schema)) = (self.capabilities().schemas, schema) {
            sql.push_str(&self.quote(schema.value()));
            sql.push('.');
        }
        sql.push_str(&self.quote(name));
        sql
    }

    fn qualify(&self, table: &TableRef) -> String {
        self.qualify_name(table.catalog.as_ref(), table.schema.as_ref(), table.table.value())
    }

    fn if_exists(&self) -> &'static str {
        if self.supports_if_exists() {
            "if exists "
        } else {
            ""
        }
    }

    /// Renders a limit/offset clause, including the leading space.
    fn limit_offset_clause(&self, limit: Option<u64>, offset: u64) -> Result<String> {
        if !self.supports_limit_offset() {
            return Err(MigrantToolsError::DialectCapability {
                dialect: self.name().to_string(),
                capability: "limit and offset".to_string(),
            });
        }

        let mut sql = String::new();
        if let Some(limit) = limit {
            sql.push_str(&format!(" limit {}", limit));
        }
        if offset > 0 {
            sql.push_str(&format!(" offset {}", offset));
        }
        Ok(sql)
    }

    /// Placeholder for the 1-based parameter `index` of a prepared statement.
    fn parameter_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Clause appended to auto increment columns.
    fn identity_clause(&self) -> Option<&str> {
        Some("generated by default as identity")
    }

    fn type_name(&self, column: &Column) -> Result<String> {
        self.type_names()
            .render(column)
            .ok_or_else(|| MigrantToolsError::UnsupportedType(column.data_type.clone()))
    }

    fn drop_foreign_key_sql(&self, table: &TableRef, name: &str) -> String {
        format!("alter table {} drop constraint {}{}", self.qualify(table), self.if_exists(), self.quote(name))
    }

    fn drop_index_sql(&self, table: &TableRef, name: &str) -> String {
        format!(
            "drop index {}{}",
            self.if_exists(),
            self.qualify_name(table.catalog.as_ref(), table.schema.as_ref(), name)
        )
    }

    fn drop_trigger_sql(&self, table: &TableRef, name: &str) -> String {
        format!("drop trigger {}{} on {}", self.if_exists(), self.quote(name), self.qualify(table))
    }

    /// Statement switching the session to a time zone, for engines that have one.
    fn session_time_zone_sql(&self, _offset: UtcOffset) -> Option<String> {
        None
    }

    /// Query for an estimated row count of a table, without scanning it.
    fn approximate_row_count_sql(&self, _table: &TableRef) -> Option<String> {
        None
    }

    fn row_count_sql(&self, query: &RowCountQuery) -> String {
        if query.mode == RowCountMode::Approximate && query.filter.is_none() {
            if let Some(sql) = self.approximate_row_count_sql(&query.table) {
                return sql;
            }
        }

        let mut sql = format!("select count(*) from {}", self.qualify(&query.table));
        if let Some(filter) = &query.filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        sql
    }

    /// Creates a handler that counts the rows a table scan would produce.
    ///
    /// Approximate counts are downgraded to exact ones when the engine cannot estimate,
    /// or a filter makes the estimate meaningless.
    fn create_row_count_handler(&self, table: &TableRef, filter: Option<&str>, mode: RowCountMode) -> RowCountHandler {
        let mode = match mode {
            RowCountMode::Approximate if filter.is_none() && self.capabilities().approximate_row_count => RowCountMode::Approximate,
            _ => RowCountMode::Exact,
        };

        RowCountHandler::new(RowCountQuery {
            table: table.clone(),
            filter: filter.map(|f| f.to_string()),
            mode,
        })
    }
}

/// Renders an offset as `+hh:mm`.
pub(crate) fn format_offset(offset: UtcOffset) -> String {
    let (hours, minutes, _) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!("{}{:02}:{:02}", sign, hours.abs(), minutes.abs())
}

#[cfg(test)]
mod tests;
