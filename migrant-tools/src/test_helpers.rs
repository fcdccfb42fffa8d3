use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use crate::connection::{ResultRow, SqlValue};
use crate::dialect::Dialect;
use crate::models::{Column, Database, ForeignKey, PrimaryKey, Table, TableRef, TypeCode, TypeDescriptor};

/// A directory for a single test.
///
/// The directory is removed when the helper is dropped, unless the test panicked, so the
/// files of a failing test can be inspected.
pub struct TestDirectory {
    path: PathBuf,
}

impl TestDirectory {
    /// Creates a new, empty directory with a random name.
    pub fn new(name: &str) -> Self {
        init_tracing();
        let id = Uuid::new_v4().simple().to_string();
        let path = std::env::temp_dir().join("migrant-tools-tests").join(format!("{}_{}", name, id));
        std::fs::create_dir_all(&path).expect("Failed to create test directory");
        TestDirectory { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the files in the directory, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names = std::fs::read_dir(&self.path)
            .expect("Failed to list test directory")
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl Drop for TestDirectory {
    fn drop(&mut self) {
        if std::thread::panicking() {
            eprintln!("Thread is panicking when dropping test directory. Leaving '{}' around to be inspected", self.path.display());
        } else {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

/// Routes logs of the crate to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `public.numbers (id integer primary key, name varchar)` with `size` rows numbered from 1.
pub fn numbers_table(size: usize) -> (Table, Vec<ResultRow>) {
    let mut table = Table::new("numbers")
        .with_column(Column::new("id", TypeDescriptor::new(TypeCode::Integer, "int4")).not_null())
        .with_column(Column::new("name", TypeDescriptor::new(TypeCode::Varchar, "varchar")).with_size(100));
    table.schema = Some("public".into());
    table.primary_key = Some(PrimaryKey::new(["id"]));

    let rows = (1..=size as i32)
        .map(|i| vec![SqlValue::Int(i), SqlValue::Text(format!("row {i}"))])
        .collect();

    (table, rows)
}

fn id_table(name: &str) -> Table {
    let mut table = Table::new(name).with_column(Column::new("id", TypeCode::Integer.into()).not_null());
    table.primary_key = Some(PrimaryKey::new(["id"]));
    table
}

fn referencing_table(name: &str, referenced: &str) -> Table {
    let column = format!("{}_id", referenced);
    let mut table = id_table(name).with_column(Column::new(column.as_str(), TypeCode::Integer.into()));
    table.foreign_keys.push(
        ForeignKey::new(TableRef::in_schema("public", name), TableRef::in_schema("public", referenced))
            .named(format!("{}_{}_fkey", name, column))
            .column(column.as_str(), "id"),
    );
    table
}

/// Tables `a`, `b -> a` and `c -> b` in schema `public`, added in reverse dependency order.
pub fn chained_database(dialect: Arc<dyn Dialect>) -> Database {
    let mut db = Database::new(dialect);
    let schema = db.get_or_create_schema_mut(None, Some("public"));
    schema.add_table(referencing_table("c", "b"));
    schema.add_table(referencing_table("b", "a"));
    schema.add_table(id_table("a"));
    db
}

/// The chain of [`chained_database`], added in dependency order.
pub fn ordered_chained_database(dialect: Arc<dyn Dialect>) -> Database {
    let mut db = Database::new(dialect);
    let schema = db.get_or_create_schema_mut(None, Some("public"));
    schema.add_table(id_table("a"));
    schema.add_table(referencing_table("b", "a"));
    schema.add_table(referencing_table("c", "b"));
    db
}

/// Tables `alpha` and `beta` referencing each other.
pub fn cyclic_database(dialect: Arc<dyn Dialect>) -> Database {
    let mut db = Database::new(dialect);
    let schema = db.get_or_create_schema_mut(None, Some("public"));
    schema.add_table(referencing_table("alpha", "beta"));
    schema.add_table(referencing_table("beta", "alpha"));
    db
}
