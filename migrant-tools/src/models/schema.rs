use crate::models::{Identifier, Sequence, Table};

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Schema {
    pub catalog: Option<Identifier>,
    /// Engines without schemas keep their tables in a single unnamed schema.
    pub name: Option<Identifier>,
    pub tables: Vec<Table>,
    pub sequences: Vec<Sequence>,
}

impl Schema {
    pub fn new(catalog: Option<Identifier>, name: Option<Identifier>) -> Self {
        Schema {
            catalog,
            name,
            ..Default::default()
        }
    }

    /// Adds a table, qualifying it with this schema and its catalog.
    pub fn add_table(&mut self, mut table: Table) -> &mut Table {
        table.catalog = self.catalog.clone();
        table.schema = self.name.clone();

        if let Some(idx) = self.tables.iter().position(|t| t.name == table.name) {
            self.tables[idx] = table;
            &mut self.tables[idx]
        } else {
            self.tables.push(table);
            let last = self.tables.len() - 1;
            &mut self.tables[last]
        }
    }

    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.matches(name))
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name.matches(name))
    }
}
