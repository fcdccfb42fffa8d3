use time::macros::offset;
use crate::connection::{InsertQuery, RowCountMode, RowCountQuery, SelectQuery};
use crate::dialect::{Capabilities, Dialect, GenericDialect, MySqlDialect, PostgresDialect};
use crate::models::{Column, Identifier, TableRef, TypeCode, TypeDescriptor};
use crate::MigrantToolsError;

fn orders() -> TableRef {
    TableRef {
        catalog: Some("shop".into()),
        schema: Some("public".into()),
        table: "Orders".into(),
    }
}

#[test]
fn qualifies_with_supported_parts() {
    assert_eq!(PostgresDialect::new().qualify(&orders()), r#"public."Orders""#);
    assert_eq!(MySqlDialect::new().qualify(&orders()), "shop.Orders");
    assert_eq!(GenericDialect::new().qualify(&orders()), r#""public"."Orders""#);
}

#[test]
fn quotes_reserved_words() {
    let postgres = PostgresDialect::new();
    assert_eq!(postgres.quote("user"), r#""user""#);
    assert_eq!(postgres.quote("customer"), "customer");

    let mysql = MySqlDialect::new();
    assert_eq!(mysql.quote("order"), "`order`");
    assert_eq!(mysql.quote("My`Table"), "`My``Table`");
}

#[test]
fn renders_select_queries() {
    let mut select = SelectQuery::new(TableRef::in_schema("public", "numbers"));
    select.columns = vec![Identifier::new("id"), Identifier::new("name")];
    select.filter = Some("id > 10".to_string());
    select.order_by = vec![Identifier::new("id")];
    select.limit = Some(100);
    select.offset = 200;

    assert_eq!(
        select.to_sql(&PostgresDialect::new()).unwrap(),
        "select id, name from public.numbers where id > 10 order by id limit 100 offset 200"
    );
    assert_eq!(
        select.to_sql(&GenericDialect::new()).unwrap(),
        r#"select "id", "name" from "public"."numbers" where id > 10 order by "id" offset 200 rows fetch next 100 rows only"#
    );
}

#[test]
fn mysql_needs_a_limit_before_an_offset() {
    let mysql = MySqlDialect::new();
    assert_eq!(mysql.limit_offset_clause(None, 0).unwrap(), "");
    assert_eq!(mysql.limit_offset_clause(Some(5), 0).unwrap(), " limit 5");
    assert_eq!(
        mysql.limit_offset_clause(None, 10).unwrap(),
        format!(" limit {} offset 10", u64::MAX)
    );
}

#[test]
fn paging_without_capability_fails() {
    let dialect = GenericDialect::new().with_capabilities(Capabilities {
        limit_offset: false,
        ..Default::default()
    });

    let result = dialect.limit_offset_clause(Some(10), 0);
    assert!(matches!(result, Err(MigrantToolsError::DialectCapability { dialect, .. }) if dialect == "generic"));
}

#[test]
fn renders_inserts_with_engine_placeholders() {
    let insert = InsertQuery {
        table: TableRef::in_schema("public", "numbers"),
        columns: vec![Identifier::new("id"), Identifier::new("name")],
    };

    assert_eq!(insert.to_sql(&PostgresDialect::new()), "insert into public.numbers (id, name) values ($1, $2)");
    assert_eq!(insert.to_sql(&MySqlDialect::new()), "insert into numbers (id, name) values (?, ?)");
}

#[test]
fn row_counts_fall_back_to_exact() {
    let postgres = PostgresDialect::new();
    let table = TableRef::in_schema("public", "numbers");

    let approximate = postgres.create_row_count_handler(&table, None, RowCountMode::Approximate);
    assert_eq!(approximate.query().mode, RowCountMode::Approximate);
    assert!(postgres.row_count_sql(approximate.query()).contains("pg_class"));

    let filtered = postgres.create_row_count_handler(&table, Some("id > 5"), RowCountMode::Approximate);
    assert_eq!(filtered.query().mode, RowCountMode::Exact);
    assert_eq!(postgres.row_count_sql(filtered.query()), "select count(*) from public.numbers where id > 5");

    let generic = GenericDialect::new();
    let handler = generic.create_row_count_handler(&table, None, RowCountMode::Approximate);
    assert_eq!(handler.query().mode, RowCountMode::Exact);

    let exact = RowCountQuery {
        table,
        filter: None,
        mode: RowCountMode::Exact,
    };
    assert_eq!(postgres.row_count_sql(&exact), "select count(*) from public.numbers");
}

#[test]
fn type_names_per_engine() {
    let varchar = Column::new("name", TypeCode::Varchar.into()).with_size(50);
    let text = Column::new("body", TypeCode::Varchar.into());
    let timestamp = Column::new("at", TypeCode::Timestamp.into());
    let uuid = Column::new("id", TypeDescriptor::new(TypeCode::Other, "uuid"));

    let postgres = PostgresDialect::new();
    assert_eq!(postgres.type_name(&varchar).unwrap(), "varchar(50)");
    assert_eq!(postgres.type_name(&text).unwrap(), "varchar");
    assert_eq!(postgres.type_name(&uuid).unwrap(), "uuid");

    let mysql = MySqlDialect::new();
    assert_eq!(mysql.type_name(&text).unwrap(), "longtext");
    assert_eq!(mysql.type_name(&timestamp).unwrap(), "datetime(6)");
    assert_eq!(mysql.type_name(&uuid).unwrap(), "char(36)");

    let unknown = Column::new("shape", TypeDescriptor::new(TypeCode::Other, "geometry"));
    assert!(matches!(postgres.type_name(&unknown), Err(MigrantToolsError::UnsupportedType(_))));
}

#[test]
fn resolves_engine_type_aliases() {
    let postgres = PostgresDialect::new();
    assert_eq!(
        postgres.resolve_type_alias(&TypeDescriptor::new(TypeCode::Other, "jsonb")),
        Some(TypeDescriptor::new(TypeCode::Other, "json"))
    );
    assert_eq!(postgres.resolve_type_alias(&TypeDescriptor::new(TypeCode::Integer, "int4")), None);

    let mysql = MySqlDialect::new();
    assert_eq!(
        mysql.resolve_type_alias(&TypeDescriptor::new(TypeCode::Other, "year")),
        Some(TypeDescriptor::of_code(TypeCode::SmallInt))
    );
}

#[test]
fn session_time_zones() {
    assert_eq!(PostgresDialect::new().session_time_zone_sql(offset!(-5:30)).as_deref(), Some("set time zone '-05:30'"));
    assert_eq!(MySqlDialect::new().session_time_zone_sql(offset!(+1)).as_deref(), Some("set time_zone = '+01:00'"));
    assert_eq!(GenericDialect::new().session_time_zone_sql(offset!(+1)), None);
}

#[test]
fn drop_statements() {
    let table = TableRef::in_schema("public", "numbers");
    let postgres = PostgresDialect::new();
    assert_eq!(postgres.drop_foreign_key_sql(&table, "numbers_fk"), "alter table public.numbers drop constraint if exists numbers_fk");
    assert_eq!(postgres.drop_index_sql(&table, "numbers_idx"), "drop index if exists public.numbers_idx");
    assert_eq!(postgres.drop_trigger_sql(&table, "numbers_trg"), "drop trigger if exists numbers_trg on public.numbers");

    let mysql = MySqlDialect::new();
    let table = TableRef {
        catalog: Some("shop".into()),
        schema: None,
        table: "numbers".into(),
    };
    assert_eq!(mysql.drop_foreign_key_sql(&table, "numbers_fk"), "alter table shop.numbers drop foreign key numbers_fk");
    assert_eq!(mysql.drop_index_sql(&table, "numbers_idx"), "drop index numbers_idx on shop.numbers");
}
