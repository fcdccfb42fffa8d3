use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use crate::catalog::{Catalog, DataFormat, RowSet, MANIFEST_FILE_NAME};
use crate::codec::PortableValue;
use crate::connection::{MemoryDatabase, ResultColumn, RowCountMode, SelectQuery, SqlValue};
use crate::dialect::{Dialect, PostgresDialect};
use crate::dump::{DumpOptions, DumpWriter};
use crate::models::{Index, TableRef, TypeCode, TypeDescriptor};
use crate::split::QueryLimit;
use crate::test_helpers::{numbers_table, TestDirectory};
use crate::MigrantToolsError;

fn dialect() -> Arc<dyn Dialect> {
    Arc::new(PostgresDialect::new())
}

fn options(parallelism: usize, page: Option<u64>) -> DumpOptions {
    DumpOptions {
        max_parallelism: NonZeroUsize::new(parallelism).unwrap(),
        query_limit: page.map(QueryLimit::new),
        rows_per_chunk: 100,
        ..Default::default()
    }
}

async fn read_entry(catalog: &Catalog, index: usize) -> Vec<Vec<PortableValue>> {
    let reader = catalog.open_reader().await.unwrap();
    let mut entry = reader.open_entry(&reader.entries()[index]).await.unwrap();
    let mut rows = Vec::new();
    while let Some(row) = entry.next_row().await.unwrap() {
        rows.push(row);
    }
    rows
}

fn ids(rows: &[Vec<PortableValue>]) -> Vec<i32> {
    let mut ids = rows
        .iter()
        .map(|r| r[0].as_text().unwrap().parse::<i32>().unwrap())
        .collect::<Vec<_>>();
    ids.sort();
    ids
}

#[tokio::test]
async fn parallel_splits_write_every_row_once() {
    for parallelism in [1, 2, 8] {
        let dir = TestDirectory::new("dump_parallel");
        let db = MemoryDatabase::new();
        let (table, rows) = numbers_table(10_000);
        db.add_table(table.clone(), rows);

        let catalog = Catalog::new(dir.path(), DataFormat::default());
        let mut dump = DumpWriter::new(db.clone(), dialect(), catalog.clone(), options(parallelism, Some(2500)));
        dump.add_table(&table, &[], None, None).unwrap();

        let manifest = dump.write().await.unwrap();

        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.entries[0].row_count, 10_000);
        assert_eq!(db.queries_finished(), 4);
        assert_eq!(db.row_count_queries(), 1);

        let rows = read_entry(&catalog, 0).await;
        assert_eq!(ids(&rows), (1..=10_000).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn records_columns_and_row_set() {
    let dir = TestDirectory::new("dump_columns");
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(3);
    db.add_table(table.clone(), rows);

    let catalog = Catalog::new(dir.path(), DataFormat::Json);
    let mut dump = DumpWriter::new(db, dialect(), catalog.clone(), options(2, None));
    dump.add_table(&table, &["name"], None, None).unwrap();

    let manifest = dump.write().await.unwrap();
    let entry = &manifest.entries[0];

    assert_eq!(entry.file, "public.numbers.0.jsonl");
    assert_eq!(
        entry.row_set,
        RowSet::Table {
            table: TableRef::in_schema("public", "numbers")
        }
    );
    assert_eq!(entry.columns.len(), 1);
    assert_eq!(entry.columns[0].name, "name");
    assert_eq!(entry.columns[0].descriptor, TypeDescriptor::new(TypeCode::Varchar, "varchar"));

    let rows = read_entry(&catalog, 0).await;
    assert_eq!(rows[2], vec![PortableValue::Text("row 3".to_string())]);
}

#[tokio::test]
async fn low_estimates_do_not_lose_rows() {
    let dir = TestDirectory::new("dump_estimate");
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(100);
    db.add_table(table.clone(), rows);
    db.set_approximate_row_count(table.table_ref(), 15);

    let catalog = Catalog::new(dir.path(), DataFormat::default());
    let mut options = options(4, Some(10));
    options.row_count_mode = RowCountMode::Approximate;

    let mut dump = DumpWriter::new(db.clone(), dialect(), catalog.clone(), options);
    dump.add_table(&table, &[], None, None).unwrap();

    let manifest = dump.write().await.unwrap();

    assert_eq!(manifest.entries[0].row_count, 100);
    assert_eq!(db.queries_finished(), 2);
    assert_eq!(ids(&read_entry(&catalog, 0).await), (1..=100).collect::<Vec<_>>());
}

#[tokio::test]
async fn tables_without_a_unique_key_are_dumped_in_one_split() {
    let dir = TestDirectory::new("dump_keyless");
    let db = MemoryDatabase::new();
    let (mut table, rows) = numbers_table(50);
    table.primary_key = None;
    table.indexes.push(Index::new(["name"]).unique());
    db.add_table(table.clone(), rows);

    let catalog = Catalog::new(dir.path(), DataFormat::default());
    let mut dump = DumpWriter::new(db.clone(), dialect(), catalog.clone(), options(4, Some(10)));
    dump.add_table(&table, &[], None, None).unwrap();

    let manifest = dump.write().await.unwrap();

    assert_eq!(manifest.entries[0].row_count, 50);
    assert_eq!(db.queries_finished(), 1);
    assert_eq!(db.row_count_queries(), 0);
    assert_eq!(ids(&read_entry(&catalog, 0).await), (1..=50).collect::<Vec<_>>());
}

#[tokio::test]
async fn unique_index_over_required_columns_allows_paging() {
    let dir = TestDirectory::new("dump_unique_index");
    let db = MemoryDatabase::new();
    let (mut table, rows) = numbers_table(50);
    table.primary_key = None;
    table.indexes.push(Index::new(["id"]).unique());
    db.add_table(table.clone(), rows);

    let catalog = Catalog::new(dir.path(), DataFormat::default());
    let mut dump = DumpWriter::new(db.clone(), dialect(), catalog.clone(), options(4, Some(10)));
    dump.add_table(&table, &[], None, None).unwrap();

    let manifest = dump.write().await.unwrap();

    assert_eq!(manifest.entries[0].row_count, 50);
    assert_eq!(db.queries_finished(), 5);
    assert_eq!(ids(&read_entry(&catalog, 0).await), (1..=50).collect::<Vec<_>>());
}

#[tokio::test]
async fn dumps_native_queries_in_one_split() {
    let dir = TestDirectory::new("dump_query");
    let db = MemoryDatabase::new();
    db.register_native_query(
        "select 42 as answer",
        vec![ResultColumn {
            name: "answer".to_string(),
            descriptor: TypeCode::Integer.into(),
        }],
        vec![vec![SqlValue::Int(42)], vec![SqlValue::Null]],
    );

    let catalog = Catalog::new(dir.path(), DataFormat::default());
    let mut dump = DumpWriter::new(db, dialect(), catalog.clone(), options(2, Some(1)));
    dump.add_query("answers", "select 42 as answer");

    let manifest = dump.write().await.unwrap();

    assert_eq!(manifest.entries[0].file, "answers.0.txt");
    assert_eq!(manifest.entries[0].row_count, 2);
    assert_eq!(
        read_entry(&catalog, 0).await,
        vec![vec![PortableValue::Text("42".to_string())], vec![PortableValue::Null]]
    );
}

#[tokio::test]
async fn failures_are_reported_after_every_split_settled() {
    let dir = TestDirectory::new("dump_failures");
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(50);
    db.add_table(table.clone(), rows);
    db.set_query_delay(Duration::from_millis(50));
    db.fail_queries_where(|q: &SelectQuery| q.offset == 10 || q.offset == 30);

    let catalog = Catalog::new(dir.path(), DataFormat::default());
    let mut dump = DumpWriter::new(db.clone(), dialect(), catalog.clone(), options(5, Some(10)));
    dump.add_table(&table, &[], None, None).unwrap();

    let result = dump.write().await;

    assert!(matches!(result, Err(MigrantToolsError::DatabaseAccess(_))), "{:?}", result.map(|_| ()));
    assert_eq!(db.queries_started(), 5);
    assert_eq!(db.queries_finished(), 5);
    assert!(!catalog.manifest_path().exists());
    assert!(!dir.file_names().contains(&MANIFEST_FILE_NAME.to_string()));
}

#[tokio::test]
async fn stopped_dump_writes_no_manifest() {
    let dir = TestDirectory::new("dump_stopped");
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(20);
    db.add_table(table.clone(), rows);

    let catalog = Catalog::new(dir.path(), DataFormat::default());
    let mut dump = DumpWriter::new(db.clone(), dialect(), catalog.clone(), options(2, Some(5)));
    dump.add_table(&table, &[], None, None).unwrap();
    dump.running_flag().stop();

    let result = dump.write().await;

    assert!(matches!(result, Err(MigrantToolsError::Cancelled)));
    assert_eq!(db.queries_started(), 0);
    assert!(!catalog.manifest_path().exists());
}

#[test]
fn rejects_unknown_columns() {
    let db = MemoryDatabase::new();
    let (table, _) = numbers_table(0);
    let mut dump = DumpWriter::new(db, dialect(), Catalog::new("unused", DataFormat::default()), options(1, None));

    let result = dump.add_table(&table, &["id", "missing"], None, None);

    assert!(matches!(result, Err(MigrantToolsError::ColumnNotFound { column, .. }) if column == "missing"));
    assert!(dump.query_infos().is_empty());
}
