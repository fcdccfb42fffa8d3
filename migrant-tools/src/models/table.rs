use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::default;
use crate::models::{Column, ForeignKey, Identifier, Index, PrimaryKey, Trigger};

/// The fully qualified name of a table.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Identifier>,
    pub table: Identifier,
}

impl TableRef {
    pub fn new(table: impl Into<Identifier>) -> Self {
        TableRef {
            catalog: None,
            schema: None,
            table: table.into(),
        }
    }

    pub fn in_schema(schema: impl Into<Identifier>, table: impl Into<Identifier>) -> Self {
        TableRef {
            catalog: None,
            schema: Some(schema.into()),
            table: table.into(),
        }
    }

    /// Parses a dotted name, reading the parts from the right: `table`, `schema.table`
    /// or `catalog.schema.table`.
    pub fn parse(name: &str) -> Self {
        let mut parts = name.rsplit('.');
        let table = parts.next().unwrap_or_default();
        let schema = parts.next().map(Identifier::new);
        let catalog = parts.next().map(Identifier::new);
        TableRef {
            catalog,
            schema,
            table: Identifier::new(table),
        }
    }

    /// True when every part present on both sides is equal.
    pub fn matches(&self, other: &TableRef) -> bool {
        fn part_matches(a: &Option<Identifier>, b: &Option<Identifier>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }

        self.table == other.table
            && part_matches(&self.schema, &other.schema)
            && part_matches(&self.catalog, &other.catalog)
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{}.", catalog)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.table)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum TableType {
    #[default]
    Table,
    View,
    SystemTable,
    Temporary,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Table {
    pub name: Identifier,
    pub catalog: Option<Identifier>,
    pub schema: Option<Identifier>,
    pub table_type: TableType,
    pub columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub triggers: Vec<Trigger>,
    pub comment: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<Identifier>) -> Self {
        Table {
            name: name.into(),
            catalog: None,
            schema: None,
            table_type: default(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            triggers: Vec::new(),
            comment: None,
        }
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            table: self.name.clone(),
        }
    }

    /// Adds a column at the end of the table. A column with the same name replaces the
    /// existing one and keeps its position.
    pub fn add_column(&mut self, mut column: Column) -> &mut Column {
        if let Some(idx) = self.columns.iter().position(|c| c.name == column.name) {
            column.position = idx + 1;
            self.columns[idx] = column;
            &mut self.columns[idx]
        } else {
            column.position = self.columns.len() + 1;
            self.columns.push(column);
            let last = self.columns.len() - 1;
            &mut self.columns[last]
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.matches(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name.matches(name))
    }

    /// Removes a column and closes the gap in the positions after it.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name.matches(name))?;
        let removed = self.columns.remove(idx);
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.position = i + 1;
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TypeCode, TypeDescriptor};

    fn int_column(name: &str) -> Column {
        Column::new(name, TypeDescriptor::of_code(TypeCode::Integer))
    }

    #[test]
    fn column_positions_stay_contiguous() {
        let mut table = Table::new("orders")
            .with_column(int_column("id"))
            .with_column(int_column("customer_id"))
            .with_column(int_column("total"));

        assert_eq!(table.columns.iter().map(|c| c.position).collect::<Vec<_>>(), vec![1, 2, 3]);

        table.add_column(int_column("CUSTOMER_ID").not_null());
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.column("customer_id").unwrap().position, 2);
        assert!(!table.column("customer_id").unwrap().is_nullable);

        table.remove_column("id");
        assert_eq!(table.columns.iter().map(|c| c.position).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn parses_dotted_names_from_the_right() {
        assert_eq!(TableRef::parse("orders"), TableRef::new("orders"));
        assert_eq!(TableRef::parse("public.orders"), TableRef::in_schema("public", "orders"));

        let full = TableRef::parse("shop.public.orders");
        assert_eq!(full.catalog, Some(Identifier::new("shop")));
        assert_eq!(full.to_string(), "shop.public.orders");
    }

    #[test]
    fn matching_ignores_missing_parts() {
        let qualified = TableRef::in_schema("public", "orders");
        assert!(qualified.matches(&TableRef::new("ORDERS")));
        assert!(!qualified.matches(&TableRef::in_schema("sales", "orders")));
    }
}
