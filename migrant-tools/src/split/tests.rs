use std::sync::Arc;
use crate::connection::{Connection, ConnectionProvider, MemoryDatabase, Query, RowCountMode, SelectQuery, SqlValue};
use crate::dialect::{Dialect, PostgresDialect};
use crate::models::{Identifier, TableRef};
use crate::split::{QueryLimit, QuerySplitter};
use crate::test_helpers::numbers_table;
use crate::MigrantToolsError;
use futures::TryStreamExt;

async fn collect_all(db: &MemoryDatabase, splitter: &mut QuerySplitter) -> (Vec<Vec<SqlValue>>, usize) {
    let mut connection = db.open_connection().await.unwrap();
    let mut rows = Vec::new();
    let mut splits = 0;

    while splitter.has_next_split(&mut connection).await.unwrap() {
        let split = splitter.next_split(&mut connection, |_| {}).await.unwrap();
        let result = connection.query(&split.query).await.unwrap();
        let mut split_rows: Vec<Vec<SqlValue>> = result.rows.try_collect().await.unwrap();
        rows.append(&mut split_rows);
        splits += 1;
    }

    (rows, splits)
}

fn ordered_scan() -> SelectQuery {
    let mut query = SelectQuery::new(TableRef::in_schema("public", "numbers"));
    query.order_by = vec![Identifier::new("id")];
    query
}

fn limit_splitter(page: u64, mode: RowCountMode) -> QuerySplitter {
    let dialect = PostgresDialect::new();
    let handler = dialect.create_row_count_handler(&TableRef::in_schema("public", "numbers"), None, mode);
    QuerySplitter::limit(ordered_scan(), QueryLimit::new(page), Arc::new(handler))
}

#[tokio::test]
async fn splits_partition_the_table() {
    for (size, expected_splits) in [(0, 1), (1, 1), (10, 1), (11, 2), (25, 3), (100, 10)] {
        let db = MemoryDatabase::new();
        let (table, rows) = numbers_table(size);
        db.add_table(table, rows.clone());

        let mut splitter = limit_splitter(10, RowCountMode::Exact);
        let (read, splits) = collect_all(&db, &mut splitter).await;

        assert_eq!(read, rows, "table of {} rows", size);
        assert_eq!(splits, expected_splits, "table of {} rows", size);
    }
}

#[tokio::test]
async fn low_estimates_do_not_drop_rows() {
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(57);
    db.add_table(table, rows.clone());
    db.set_approximate_row_count(TableRef::new("numbers"), 20);

    let mut splitter = limit_splitter(10, RowCountMode::Approximate);
    let (read, splits) = collect_all(&db, &mut splitter).await;

    assert_eq!(read, rows);
    assert_eq!(splits, 2);
}

#[tokio::test]
async fn high_estimates_produce_empty_trailing_splits() {
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(15);
    db.add_table(table, rows.clone());
    db.set_approximate_row_count(TableRef::new("numbers"), 40);

    let mut splitter = limit_splitter(10, RowCountMode::Approximate);
    let (read, splits) = collect_all(&db, &mut splitter).await;

    assert_eq!(read, rows);
    assert_eq!(splits, 4);
}

#[tokio::test]
async fn row_count_is_computed_once() {
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(35);
    db.add_table(table, rows);

    let mut splitter = limit_splitter(10, RowCountMode::Exact);
    collect_all(&db, &mut splitter).await;

    assert_eq!(db.row_count_queries(), 1);
}

#[tokio::test]
async fn splits_are_repeatable() {
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(30);
    db.add_table(table, rows);
    let mut connection = db.open_connection().await.unwrap();

    let mut first = limit_splitter(7, RowCountMode::Exact);
    let mut second = limit_splitter(7, RowCountMode::Exact);

    while first.has_next_split(&mut connection).await.unwrap() {
        let a = first.next_split(&mut connection, |_| {}).await.unwrap();
        let b = second.next_split(&mut connection, |_| {}).await.unwrap();
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn exhausted_splitter_fails() {
    let db = MemoryDatabase::new();
    let (table, rows) = numbers_table(3);
    db.add_table(table, rows);
    let mut connection = db.open_connection().await.unwrap();

    let mut splitter = QuerySplitter::no_limit(Query::Select(ordered_scan()));
    let split = splitter
        .next_split(&mut connection, |split| split.stream_results = false)
        .await
        .unwrap();
    assert!(!split.has_next);
    assert!(!split.stream_results);

    let result = splitter.next_split(&mut connection, |_| {}).await;
    assert!(matches!(result, Err(MigrantToolsError::SplitterExhaustion)));
}
