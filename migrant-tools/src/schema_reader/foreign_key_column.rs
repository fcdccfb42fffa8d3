use tokio_postgres::Row;
use crate::connection::FromRow;
use crate::schema_reader::define_working_query;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ForeignKeyColumnResult {
    pub constraint_name: String,
    pub source_table_name: String,
    pub source_schema_name: String,
    pub source_table_column_name: String,
    pub target_table_column_name: String,
}

impl FromRow for ForeignKeyColumnResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(Self {
            constraint_name: row.try_get(0)?,
            source_table_name: row.try_get(1)?,
            source_schema_name: row.try_get(2)?,
            source_table_column_name: row.try_get(3)?,
            target_table_column_name: row.try_get(4)?,
        })
    }
}

//language=postgresql
define_working_query!(get_foreign_key_columns, ForeignKeyColumnResult, r#"
select con.conname               as constraint_name,
       tab.relname               as source_table_name,
       tab_ns.nspname            as source_schema_name,
       source_table_attr.attname as source_table_column_name,
       target_table_attr.attname as target_table_column_name
from pg_constraint con
         join pg_catalog.pg_class tab on con.conrelid = tab.oid
         left join pg_namespace tab_ns on tab_ns.oid = tab.relnamespace
         join unnest(con.conkey, con.confkey) with ordinality as cols (conkey, confkey, ordinality) on true
         left join pg_attribute source_table_attr
                   on source_table_attr.attrelid = con.conrelid and source_table_attr.attnum = cols.conkey
         left join pg_attribute target_table_attr
                   on target_table_attr.attrelid = con.confrelid and target_table_attr.attnum = cols.confkey
where con.contype = 'f'
  and tab.oid > 16384
order by source_schema_name, source_table_name, constraint_name, cols.ordinality;
"#);
