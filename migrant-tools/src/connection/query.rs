use itertools::Itertools;
use serde::{Deserialize, Serialize};
use crate::dialect::Dialect;
use crate::helpers::StringExt;
use crate::models::{Identifier, TableRef};
use crate::Result;

/// A scan of one table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SelectQuery {
    pub table: TableRef,
    /// Empty selects every column.
    pub columns: Vec<Identifier>,
    pub filter: Option<String>,
    pub order_by: Vec<Identifier>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl SelectQuery {
    pub fn new(table: TableRef) -> Self {
        SelectQuery {
            table,
            columns: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        let mut sql = "select ".to_string();
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_join(", ", self.columns.iter().map(|c| dialect.quote_column(c.value())));
        }
        sql.push_str(" from ");
        sql.push_str(&dialect.qualify(&self.table));

        if let Some(filter) = &self.filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" order by ");
            sql.push_join(", ", self.order_by.iter().map(|c| dialect.quote_column(c.value())));
        }

        if self.limit.is_some() || self.offset > 0 {
            sql.push_str(&dialect.limit_offset_clause(self.limit, self.offset)?);
        }

        Ok(sql)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Query {
    Select(SelectQuery),
    /// A query string passed to the engine untouched.
    Native(String),
}

impl Query {
    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        match self {
            Query::Select(select) => select.to_sql(dialect),
            Query::Native(sql) => Ok(sql.clone()),
        }
    }
}

/// A parameterized insert covering exactly the listed columns.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InsertQuery {
    pub table: TableRef,
    pub columns: Vec<Identifier>,
}

impl InsertQuery {
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        format!(
            "insert into {} ({}) values ({})",
            dialect.qualify(&self.table),
            self.columns.iter().map(|c| dialect.quote_column(c.value())).join(", "),
            (1..=self.columns.len()).map(|i| dialect.parameter_placeholder(i)).join(", ")
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowCountMode {
    #[default]
    Exact,
    Approximate,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RowCountQuery {
    pub table: TableRef,
    pub filter: Option<String>,
    pub mode: RowCountMode,
}
