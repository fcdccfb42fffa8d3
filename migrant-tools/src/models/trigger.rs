use crate::models::{Identifier, TableRef};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum TriggerType {
    #[default]
    Trigger,
    /// Fires on changes to a single column.
    ColumnTrigger,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum TriggerTiming {
    #[default]
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "before",
            TriggerTiming::After => "after",
            TriggerTiming::InsteadOf => "instead of",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum TriggerEvent {
    #[default]
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "insert",
            TriggerEvent::Update => "update",
            TriggerEvent::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Trigger {
    pub name: Option<Identifier>,
    pub table: TableRef,
    pub trigger_type: TriggerType,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    pub column: Option<Identifier>,
    /// Engine native trigger action, for example `execute function audit()`.
    pub body: String,
}
