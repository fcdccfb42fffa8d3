use tokio_postgres::Row;
use crate::connection::FromRow;
use crate::schema_reader::define_working_query;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PrimaryKeyColumnResult {
    pub schema_name: String,
    pub table_name: String,
    pub constraint_name: String,
    pub column_name: String,
}

impl FromRow for PrimaryKeyColumnResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(PrimaryKeyColumnResult {
            schema_name: row.try_get(0)?,
            table_name: row.try_get(1)?,
            constraint_name: row.try_get(2)?,
            column_name: row.try_get(3)?,
        })
    }
}

//language=postgresql
define_working_query!(get_primary_key_columns, PrimaryKeyColumnResult, r#"
select ns.nspname, cl.relname, con.conname, attr.attname
from pg_constraint con
         join pg_class cl on cl.oid = con.conrelid
         join pg_namespace ns on ns.oid = cl.relnamespace
         join unnest(con.conkey) with ordinality as cols (attnum, ordinality) on true
         join pg_attribute attr on attr.attrelid = con.conrelid and attr.attnum = cols.attnum
where con.contype = 'p'
  and cl.oid > 16384
order by ns.nspname, cl.relname, cols.ordinality;
"#);
