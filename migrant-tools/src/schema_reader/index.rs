use tokio_postgres::Row;
use crate::connection::FromRow;
use crate::schema_reader::define_working_query;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IndexResult {
    pub table_schema: String,
    pub table_name: String,
    pub index_name: String,
    pub index_predicate: Option<String>,
    pub is_unique: bool,
    pub is_primary_key: bool,
}

impl FromRow for IndexResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(IndexResult {
            table_schema: row.try_get(0)?,
            table_name: row.try_get(1)?,
            index_name: row.try_get(2)?,
            index_predicate: row.try_get(3)?,
            is_unique: row.try_get(4)?,
            is_primary_key: row.try_get(5)?,
        })
    }
}

//language=postgresql
define_working_query!(get_indices, IndexResult, r#"
select n.nspname           as table_schema,
       table_class.relname as table_name,
       index_class.relname as index_name,
       pg_catalog.pg_get_expr(i.indpred, i.indrelid, true) as index_predicate,
       i.indisunique       as is_unique,
       i.indisprimary      as is_primary_key
from pg_index i
         join pg_class table_class on table_class.oid = i.indrelid
         join pg_class index_class on index_class.oid = i.indexrelid
         left join pg_namespace n on n.oid = table_class.relnamespace
         left join pg_depend dep on dep.objid = n.oid
where table_class.oid > 16384
  and table_class.relkind = 'r'
  and (dep.objid is null or dep.deptype <> 'e')
order by table_schema, table_name, index_name;
"#);
