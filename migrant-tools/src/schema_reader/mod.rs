use std::sync::Arc;
use futures::try_join;
use itertools::Itertools;
use tracing::instrument;
use crate::connection::{descriptor_for_type_name, PostgresClientWrapper};
use crate::dialect::PostgresDialect;
use crate::models::*;
use crate::Result;
use crate::schema_reader::foreign_key::ForeignKeyResult;
use crate::schema_reader::foreign_key_column::ForeignKeyColumnResult;
use crate::schema_reader::index::IndexResult;
use crate::schema_reader::index_column::IndexColumnResult;
use crate::schema_reader::primary_key::PrimaryKeyColumnResult;
use crate::schema_reader::sequence::SequenceResult;
use crate::schema_reader::table::TablesResult;
use crate::schema_reader::table_column::TableColumnsResult;

mod foreign_key;
mod foreign_key_column;
mod index;
mod index_column;
mod primary_key;
mod sequence;
mod table;
mod table_column;

/// Reads the metadata model of a Postgres database.
pub struct SchemaReader<'a> {
    connection: &'a PostgresClientWrapper,
}

impl SchemaReader<'_> {
    pub fn new(connection: &PostgresClientWrapper) -> SchemaReader {
        SchemaReader { connection }
    }

    /// Introspects the connected database into a model with a single catalog, named after
    /// the database. The model carries a dialect primed with the server's keywords.
    #[instrument(skip_all)]
    pub async fn introspect_database(&self) -> Result<Database> {
        let mut dialect = PostgresDialect::new();

        let (
            _,
            tables,
            columns,
            primary_key_columns,
            foreign_keys,
            foreign_key_columns,
            indices,
            index_columns,
            sequences,
        ) = try_join!(
            dialect.load_keywords(self.connection),
            self.get_tables(),
            self.get_columns(),
            self.get_primary_key_columns(),
            self.get_foreign_keys(),
            self.get_foreign_key_columns(),
            self.get_indices(),
            self.get_index_columns(),
            self.get_sequences()
        )?;

        let (database_name, version): (String, String) = self
            .connection
            .get_result("select current_database()::text, current_setting('server_version')")
            .await?;

        let introspection = Introspection {
            tables,
            columns,
            primary_key_columns,
            foreign_keys,
            foreign_key_columns,
            indices,
            index_columns,
            sequences,
        };

        let mut db = Database::new(Arc::new(dialect));
        db.info = DatabaseInfo {
            product_name: "PostgreSQL".to_string(),
            product_version: Some(version),
        };
        db.catalogs.push(introspection.into_catalog(Some(database_name)));

        Ok(db)
    }
}

/// Raw results of the catalog queries.
#[derive(Debug, Default)]
struct Introspection {
    tables: Vec<TablesResult>,
    columns: Vec<TableColumnsResult>,
    primary_key_columns: Vec<PrimaryKeyColumnResult>,
    foreign_keys: Vec<ForeignKeyResult>,
    foreign_key_columns: Vec<ForeignKeyColumnResult>,
    indices: Vec<IndexResult>,
    index_columns: Vec<IndexColumnResult>,
    sequences: Vec<SequenceResult>,
}

impl Introspection {
    fn into_catalog(self, name: Option<String>) -> DatabaseCatalog {
        let mut catalog = DatabaseCatalog::new(name.map(Identifier::new));

        for row in &self.tables {
            let table = self.build_table(row);
            catalog
                .get_or_create_schema_mut(Some(row.schema_name.as_str()))
                .add_table(table);
        }

        for row in &self.sequences {
            catalog
                .get_or_create_schema_mut(Some(row.schema_name.as_str()))
                .add_sequence(row.to_sequence());
        }

        catalog
    }

    fn build_table(&self, row: &TablesResult) -> Table {
        let mut table = Table::new(row.table_name.as_str());
        table.table_type = row.table_type;
        table.comment = row.comment.clone();

        for column in self
            .columns
            .iter()
            .filter(|c| c.schema_name == row.schema_name && c.table_name == row.table_name)
            .sorted_by_key(|c| c.ordinal_position)
        {
            table.add_column(column.to_column());
        }

        let key_columns = self
            .primary_key_columns
            .iter()
            .filter(|c| c.schema_name == row.schema_name && c.table_name == row.table_name)
            .collect_vec();
        if let Some(first) = key_columns.first() {
            table.primary_key = Some(
                PrimaryKey::new(key_columns.iter().map(|c| c.column_name.as_str()))
                    .named(first.constraint_name.as_str()),
            );
        }

        for index in self
            .indices
            .iter()
            .filter(|i| i.table_schema == row.schema_name && i.table_name == row.table_name)
        {
            table.indexes.push(Index {
                name: Some(Identifier::new(index.index_name.as_str())),
                columns: self
                    .index_columns
                    .iter()
                    .filter(|c| {
                        c.table_schema == index.table_schema
                            && c.table_name == index.table_name
                            && c.index_name == index.index_name
                    })
                    .map(|c| IndexColumn {
                        name: Identifier::new(unquote(&c.column_expression)),
                        descending: c.is_desc,
                    })
                    .collect(),
                unique: index.is_unique,
                primary: index.is_primary_key,
                predicate: index.index_predicate.clone(),
            });
        }

        let table_ref = TableRef::in_schema(row.schema_name.as_str(), row.table_name.as_str());
        for fk in self
            .foreign_keys
            .iter()
            .filter(|f| f.source_schema_name == row.schema_name && f.source_table_name == row.table_name)
        {
            let mut foreign_key = ForeignKey::new(
                table_ref.clone(),
                TableRef::in_schema(fk.target_schema_name.as_str(), fk.target_table_name.as_str()),
            )
            .named(fk.constraint_name.as_str())
            .on_update(fk.update_action)
            .on_delete(fk.delete_action);

            for column in self.foreign_key_columns.iter().filter(|c| {
                c.constraint_name == fk.constraint_name
                    && c.source_schema_name == fk.source_schema_name
                    && c.source_table_name == fk.source_table_name
            }) {
                foreign_key = foreign_key.column(
                    column.source_table_column_name.as_str(),
                    column.target_table_column_name.as_str(),
                );
            }

            table.foreign_keys.push(foreign_key);
        }

        table
    }
}

impl TableColumnsResult {
    fn to_column(&self) -> Column {
        let mut column = Column::new(self.column_name.as_str(), descriptor_for_type_name(&self.data_type));
        column.is_nullable = self.is_nullable;
        column.comment = self.comment.clone();
        column.size = self.data_type_length.and_then(|l| u32::try_from(l).ok());

        if matches!(column.type_code(), TypeCode::Numeric | TypeCode::Decimal) {
            if let Some(precision) = self.numeric_precision.and_then(|p| u32::try_from(p).ok()) {
                column.precision = precision;
            }
            if let Some(scale) = self.numeric_scale.and_then(|s| u32::try_from(s).ok()) {
                column.scale = scale;
            }
        }

        if self.is_identity {
            column.auto_increment = true;
        } else {
            column.default_value = self.column_default.clone();
        }

        column
    }
}

impl SequenceResult {
    fn to_sequence(&self) -> Sequence {
        let ascending = self.increment_by > 0;
        let (default_min, default_max) = if ascending { (1, i64::MAX) } else { (i64::MIN, -1) };

        let mut sequence = Sequence {
            start_with: self.start_value,
            last_value: self.last_value,
            increment_by: self.increment_by,
            min_value: Some(self.min_value).filter(|v| *v != default_min),
            max_value: Some(self.max_value).filter(|v| *v != default_max),
            cycle: self.cycle,
            cache: Some(self.cache_size).filter(|c| *c != 1),
            ..Sequence::new(self.sequence_name.as_str())
        };

        if let (Some(schema), Some(table), Some(column)) = (&self.owner_schema_name, &self.owner_table_name, &self.owner_column_name) {
            sequence = sequence.owned_by(TableRef::in_schema(schema.as_str(), table.as_str()), column.as_str());
        }

        sequence
    }
}

/// `pg_get_indexdef` quotes column names that need it.
fn unquote(expression: &str) -> String {
    match expression.strip_prefix('"').and_then(|e| e.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => expression.to_string(),
    }
}

macro_rules! define_working_query {
    ($fn_name:ident, $result:ident, $query:literal) => {
        impl $crate::schema_reader::SchemaReader<'_> {
            #[tracing::instrument(skip_all)]
            pub(in crate::schema_reader) async fn $fn_name(&self) -> $crate::Result<Vec<$result>> {
                self.connection.get_results($query).await
            }
        }
    };
}

pub(crate) use define_working_query;
