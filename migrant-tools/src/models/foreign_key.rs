use crate::models::{Identifier, TableRef};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ForeignKey {
    pub name: Option<Identifier>,
    /// The referenced table.
    pub primary_table: TableRef,
    /// The table declaring the key.
    pub foreign_table: TableRef,
    pub columns: Vec<ForeignKeyColumn>,
    pub update_action: ReferenceAction,
    pub delete_action: ReferenceAction,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ForeignKeyColumn {
    pub foreign_column: Identifier,
    pub primary_column: Identifier,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ReferenceAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferenceAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferenceAction::NoAction => "no action",
            ReferenceAction::Restrict => "restrict",
            ReferenceAction::Cascade => "cascade",
            ReferenceAction::SetNull => "set null",
            ReferenceAction::SetDefault => "set default",
        }
    }
}

impl ForeignKey {
    pub fn new(foreign_table: TableRef, primary_table: TableRef) -> Self {
        ForeignKey {
            name: None,
            primary_table,
            foreign_table,
            columns: Vec::new(),
            update_action: ReferenceAction::NoAction,
            delete_action: ReferenceAction::NoAction,
        }
    }

    pub fn named(mut self, name: impl Into<Identifier>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn column(mut self, foreign_column: impl Into<Identifier>, primary_column: impl Into<Identifier>) -> Self {
        self.columns.push(ForeignKeyColumn {
            foreign_column: foreign_column.into(),
            primary_column: primary_column.into(),
        });
        self
    }

    pub fn on_delete(mut self, action: ReferenceAction) -> Self {
        self.delete_action = action;
        self
    }

    pub fn on_update(mut self, action: ReferenceAction) -> Self {
        self.update_action = action;
        self
    }
}
