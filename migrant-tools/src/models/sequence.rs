use crate::models::{Identifier, TableRef};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Sequence {
    pub name: Option<Identifier>,
    pub start_with: i64,
    pub last_value: Option<i64>,
    pub increment_by: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
    pub cache: Option<i64>,
    /// Columns whose values are drawn from this sequence.
    pub owners: Vec<ColumnRef>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ColumnRef {
    pub table: TableRef,
    pub column: Identifier,
}

impl Default for Sequence {
    fn default() -> Self {
        Sequence {
            name: None,
            start_with: 1,
            last_value: None,
            increment_by: 1,
            min_value: None,
            max_value: None,
            cycle: false,
            cache: None,
            owners: Vec::new(),
        }
    }
}

impl Sequence {
    pub fn new(name: impl Into<Identifier>) -> Self {
        Sequence {
            name: Some(name.into()),
            ..Sequence::default()
        }
    }

    pub fn owned_by(mut self, table: TableRef, column: impl Into<Identifier>) -> Self {
        self.owners.push(ColumnRef {
            table,
            column: column.into(),
        });
        self
    }
}
