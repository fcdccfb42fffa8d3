use std::sync::Arc;
use time::macros::{datetime, offset};
use crate::catalog::{Catalog, DataFormat, EncodedColumn, RowSet};
use crate::codec::PortableValue;
use crate::connection::{MemoryDatabase, SqlValue};
use crate::dialect::{Dialect, GenericDialect, PostgresDialect};
use crate::load::{LoadJob, LoadOptions};
use crate::models::{Column, Database, Table, TableRef, TypeCode, TypeDescriptor};
use crate::test_helpers::{numbers_table, TestDirectory};
use crate::MigrantToolsError;

fn postgres() -> Arc<dyn Dialect> {
    Arc::new(PostgresDialect::new())
}

fn numbers_columns() -> Vec<EncodedColumn> {
    vec![
        EncodedColumn::new("id", TypeDescriptor::new(TypeCode::Integer, "int4")),
        EncodedColumn::new("name", TypeDescriptor::new(TypeCode::Varchar, "varchar")),
    ]
}

async fn write_catalog(dir: &TestDirectory, row_set: RowSet, columns: Vec<EncodedColumn>, rows: Vec<Vec<PortableValue>>) -> Catalog {
    let format = DataFormat::default();
    let catalog = Catalog::new(dir.path(), format);
    let mut writer = catalog.open_writer().await.unwrap();
    let entry = writer.add_row_set(row_set).await.unwrap();

    let mut data = String::new();
    for row in &rows {
        format.encode_row(row, &mut data).unwrap();
    }
    entry.append(&columns, &data, rows.len() as u64).await.unwrap();
    writer.finish(None).await.unwrap();

    catalog
}

fn numbers_rows(count: i32) -> Vec<Vec<PortableValue>> {
    (1..=count)
        .map(|i| vec![PortableValue::Text(i.to_string()), PortableValue::Text(format!("row {i}"))])
        .collect()
}

fn numbers_row_set() -> RowSet {
    RowSet::Table {
        table: TableRef::in_schema("public", "numbers"),
    }
}

/// `public.numbers` in the target has an extra `created_at` column with a default.
fn target_with_created_at() -> Database {
    let (table, _) = numbers_table(0);
    let table = table.with_column(Column::new("created_at", TypeCode::Timestamp.into()).not_null().with_default("now()"));

    let mut db = Database::new(postgres());
    db.get_or_create_schema_mut(None, Some("public")).add_table(table);
    db
}

#[tokio::test]
async fn extra_target_columns_keep_their_defaults() {
    let dir = TestDirectory::new("load_defaults");
    let catalog = write_catalog(&dir, numbers_row_set(), numbers_columns(), numbers_rows(5)).await;
    let target = target_with_created_at();
    let db = MemoryDatabase::from_model(&target);

    let job = LoadJob::new(db.clone(), postgres(), LoadOptions { batch_size: 2, ..Default::default() });
    let loaded = job.load(&catalog, &target).await.unwrap();

    assert_eq!(loaded, 5);
    assert_eq!(db.commits(), 1);

    let rows = db.rows("public.numbers");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0], vec![SqlValue::Int(1), SqlValue::Text("row 1".to_string()), SqlValue::Text("now()".to_string())]);
    assert_eq!(rows[4][0], SqlValue::Int(5));
}

#[tokio::test]
async fn unknown_catalog_column_fails() {
    let dir = TestDirectory::new("load_missing_column");
    let mut columns = numbers_columns();
    columns.push(EncodedColumn::new("deleted", TypeCode::Boolean.into()));
    let rows = numbers_rows(2)
        .into_iter()
        .map(|mut r| {
            r.push(PortableValue::Text("false".to_string()));
            r
        })
        .collect();

    let catalog = write_catalog(&dir, numbers_row_set(), columns, rows).await;
    let target = target_with_created_at();
    let db = MemoryDatabase::from_model(&target);

    let result = LoadJob::new(db.clone(), postgres(), LoadOptions::default()).load(&catalog, &target).await;

    assert!(matches!(result, Err(MigrantToolsError::ColumnNotFound { column, .. }) if column == "deleted"));
    assert_eq!(db.commits(), 0);
    assert!(db.rows("public.numbers").is_empty());
}

#[tokio::test]
async fn unknown_table_fails() {
    let dir = TestDirectory::new("load_missing_table");
    let row_set = RowSet::Table {
        table: TableRef::in_schema("public", "letters"),
    };
    let catalog = write_catalog(&dir, row_set, numbers_columns(), numbers_rows(1)).await;
    let target = target_with_created_at();

    let result = LoadJob::new(MemoryDatabase::from_model(&target), postgres(), LoadOptions::default())
        .load(&catalog, &target)
        .await;

    assert!(matches!(result, Err(MigrantToolsError::TableNotFound(name)) if name == "public.letters"));
}

#[tokio::test]
async fn query_entries_load_into_table_of_same_name() {
    let dir = TestDirectory::new("load_query");
    let row_set = RowSet::Query {
        name: "numbers".to_string(),
        query: "select id, name from numbers".to_string(),
    };
    let catalog = write_catalog(&dir, row_set, numbers_columns(), numbers_rows(3)).await;
    let target = target_with_created_at();
    let db = MemoryDatabase::from_model(&target);

    LoadJob::new(db.clone(), postgres(), LoadOptions::default()).load(&catalog, &target).await.unwrap();

    assert_eq!(db.rows("numbers").len(), 3);
}

#[tokio::test]
async fn failing_insert_aborts_the_load() {
    let dir = TestDirectory::new("load_failure");
    let catalog = write_catalog(&dir, numbers_row_set(), numbers_columns(), numbers_rows(10)).await;
    let target = target_with_created_at();
    let db = MemoryDatabase::from_model(&target);
    db.fail_inserts_where(|row| row[0] == SqlValue::Int(7));

    let job = LoadJob::new(db.clone(), postgres(), LoadOptions { batch_size: 3, ..Default::default() });
    let result = job.load(&catalog, &target).await;

    assert!(matches!(result, Err(MigrantToolsError::DatabaseAccess(_))));
    assert_eq!(db.commits(), 0);
    assert_eq!(db.rollbacks(), 0);
    assert_eq!(db.rows("numbers").len(), 6);
}

#[tokio::test]
async fn session_time_zone_is_set_when_supported() {
    let dir = TestDirectory::new("load_session_tz");
    let catalog = write_catalog(&dir, numbers_row_set(), numbers_columns(), numbers_rows(1)).await;
    let target = target_with_created_at();
    let db = MemoryDatabase::from_model(&target);

    let options = LoadOptions {
        time_zone: Some(offset!(+2)),
        ..Default::default()
    };
    LoadJob::new(db.clone(), postgres(), options).load(&catalog, &target).await.unwrap();

    assert_eq!(db.executed_statements(), vec!["begin".to_string(), "set time zone '+02:00'".to_string()]);
}

#[tokio::test]
async fn codecs_shift_timestamps_without_session_time_zone() {
    let dir = TestDirectory::new("load_codec_tz");
    let row_set = RowSet::Table {
        table: TableRef::new("events"),
    };
    let columns = vec![EncodedColumn::new("happened_at", TypeCode::Timestamp.into())];
    let rows = vec![vec![PortableValue::Text("2024-01-01 08:00:00.0".to_string())]];
    let catalog = write_catalog(&dir, row_set, columns, rows).await;

    let dialect: Arc<dyn Dialect> = Arc::new(GenericDialect::new());
    let mut target = Database::new(dialect.clone());
    target
        .get_or_create_schema_mut(None, None)
        .add_table(Table::new("events").with_column(Column::new("happened_at", TypeCode::Timestamp.into())));
    let db = MemoryDatabase::from_model(&target);

    let options = LoadOptions {
        time_zone: Some(offset!(+2)),
        ..Default::default()
    };
    LoadJob::new(db.clone(), dialect, options).load(&catalog, &target).await.unwrap();

    assert!(db.executed_statements().iter().all(|s| !s.contains("time zone")));
    assert_eq!(db.rows("events"), vec![vec![SqlValue::Timestamp(datetime!(2024-01-01 10:00:00))]]);
}
