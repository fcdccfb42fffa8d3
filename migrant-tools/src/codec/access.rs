use crate::connection::SqlValue;
use crate::models::TypeDescriptor;
use crate::{MigrantToolsError, Result};

/// A cursor position values are read from.
pub trait ColumnAccess {
    fn get(&self, slot: usize) -> Result<&SqlValue>;
}

/// Statement parameters values are written to.
pub trait ParameterAccess {
    fn set(&mut self, slot: usize, value: SqlValue) -> Result;

    fn set_null(&mut self, slot: usize, descriptor: &TypeDescriptor) -> Result;
}

impl ColumnAccess for [SqlValue] {
    fn get(&self, slot: usize) -> Result<&SqlValue> {
        <[SqlValue]>::get(self, slot).ok_or_else(|| MigrantToolsError::InvalidNumberOfResults {
            actual: self.len(),
            expected: slot + 1,
        })
    }
}

impl ColumnAccess for Vec<SqlValue> {
    fn get(&self, slot: usize) -> Result<&SqlValue> {
        ColumnAccess::get(self.as_slice(), slot)
    }
}

/// One row of parameters for a prepared insert.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParameterRow {
    values: Vec<SqlValue>,
}

impl ParameterRow {
    pub fn new(width: usize) -> Self {
        ParameterRow {
            values: vec![SqlValue::Null; width],
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Hands out the bound values and resets every slot.
    pub fn take(&mut self) -> Vec<SqlValue> {
        let width = self.values.len();
        std::mem::replace(&mut self.values, vec![SqlValue::Null; width])
    }
}

impl ParameterAccess for ParameterRow {
    fn set(&mut self, slot: usize, value: SqlValue) -> Result {
        let width = self.values.len();
        let target = self.values.get_mut(slot).ok_or(MigrantToolsError::InvalidNumberOfResults {
            actual: width,
            expected: slot + 1,
        })?;
        *target = value;
        Ok(())
    }

    fn set_null(&mut self, slot: usize, _descriptor: &TypeDescriptor) -> Result {
        self.set(slot, SqlValue::Null)
    }
}
