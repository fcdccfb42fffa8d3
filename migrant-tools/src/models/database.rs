use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::dialect::Dialect;
use crate::models::{Identifier, Schema, Sequence, Table, TableRef};

/// Product information about the database a model was read from.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_version: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct DatabaseCatalog {
    pub name: Option<Identifier>,
    pub schemas: Vec<Schema>,
}

impl DatabaseCatalog {
    pub fn new(name: Option<Identifier>) -> Self {
        DatabaseCatalog {
            name,
            schemas: Vec::new(),
        }
    }

    pub fn get_or_create_schema_mut(&mut self, schema_name: Option<&str>) -> &mut Schema {
        let wanted = schema_name.map(Identifier::new);
        if let Some(position) = self.schemas.iter().position(|s| s.name == wanted) {
            &mut self.schemas[position]
        } else {
            self.schemas.push(Schema::new(self.name.clone(), wanted));
            let last = self.schemas.len() - 1;
            &mut self.schemas[last]
        }
    }
}

/// The root of the metadata model.
#[derive(Clone, Default)]
pub struct Database {
    pub catalogs: Vec<DatabaseCatalog>,
    pub info: DatabaseInfo,
    pub dialect: Option<Arc<dyn Dialect>>,
}

impl Database {
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Database {
            catalogs: Vec::new(),
            info: DatabaseInfo {
                product_name: dialect.name().to_string(),
                product_version: None,
            },
            dialect: Some(dialect),
        }
    }

    /// Catalog names are unique, asking for an existing name returns that catalog.
    pub fn get_or_create_catalog_mut(&mut self, catalog_name: Option<&str>) -> &mut DatabaseCatalog {
        let wanted = catalog_name.map(Identifier::new);
        if let Some(position) = self.catalogs.iter().position(|c| c.name == wanted) {
            &mut self.catalogs[position]
        } else {
            self.catalogs.push(DatabaseCatalog::new(wanted));
            let last = self.catalogs.len() - 1;
            &mut self.catalogs[last]
        }
    }

    pub fn get_or_create_schema_mut(&mut self, catalog_name: Option<&str>, schema_name: Option<&str>) -> &mut Schema {
        self.get_or_create_catalog_mut(catalog_name)
            .get_or_create_schema_mut(schema_name)
    }

    /// Finds a table by a possibly qualified, dotted name.
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.find_table_ref(&TableRef::parse(name))
    }

    pub fn find_table_ref(&self, table_ref: &TableRef) -> Option<&Table> {
        self.tables().into_iter().find(|t| t.table_ref().matches(table_ref))
    }

    pub fn find_table_ref_mut(&mut self, table_ref: &TableRef) -> Option<&mut Table> {
        self.catalogs
            .iter_mut()
            .flat_map(|c| c.schemas.iter_mut())
            .flat_map(|s| s.tables.iter_mut())
            .find(|t| t.table_ref().matches(table_ref))
    }
}

impl Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("catalogs", &self.catalogs)
            .field("info", &self.info)
            .field("dialect", &self.dialect.as_ref().map(|d| d.name()))
            .finish()
    }
}

impl PartialEq for Database {
    fn eq(&self, other: &Self) -> bool {
        self.catalogs == other.catalogs
            && self.info == other.info
            && self.dialect.as_ref().map(|d| d.name()) == other.dialect.as_ref().map(|d| d.name())
    }
}

/// Anything that owns schemas and can be handed to the script generator.
pub trait HasTables {
    fn schemas(&self) -> Vec<&Schema>;

    fn tables(&self) -> Vec<&Table> {
        self.schemas().into_iter().flat_map(|s| s.tables.iter()).collect()
    }

    fn sequences(&self) -> Vec<&Sequence> {
        self.schemas().into_iter().flat_map(|s| s.sequences.iter()).collect()
    }
}

impl HasTables for Database {
    fn schemas(&self) -> Vec<&Schema> {
        self.catalogs.iter().flat_map(|c| c.schemas.iter()).collect()
    }
}

impl HasTables for DatabaseCatalog {
    fn schemas(&self) -> Vec<&Schema> {
        self.schemas.iter().collect()
    }
}

impl HasTables for Schema {
    fn schemas(&self) -> Vec<&Schema> {
        vec![self]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;

    #[test]
    fn finds_tables_by_qualified_and_plain_names() {
        let mut db = Database::default();
        db.get_or_create_schema_mut(Some("shop"), Some("public"))
            .add_table(Table::new("Orders"));
        db.get_or_create_schema_mut(Some("shop"), Some("audit"))
            .add_table(Table::new("log"));

        assert_eq!(db.catalogs.len(), 1);
        assert_eq!(db.find_table("orders").map(|t| t.name.value()), Some("Orders"));
        assert!(db.find_table("public.orders").is_some());
        assert!(db.find_table("shop.audit.log").is_some());
        assert!(db.find_table("audit.orders").is_none());
        assert_eq!(db.tables().len(), 2);
    }

    #[test]
    fn tables_inherit_schema_qualification() {
        let mut db = Database::default();
        let table = db.get_or_create_schema_mut(None, Some("public")).add_table(Table::new("users"));

        assert_eq!(table.table_ref(), TableRef::in_schema("public", "users"));
    }
}
