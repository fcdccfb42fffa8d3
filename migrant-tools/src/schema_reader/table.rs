use tokio_postgres::Row;
use crate::connection::{FromPgChar, FromRow, RowEnumExt};
use crate::models::TableType;
use crate::schema_reader::define_working_query;
use crate::MigrantToolsError;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TablesResult {
    pub schema_name: String,
    pub table_name: String,
    pub table_type: TableType,
    pub comment: Option<String>,
}

impl FromRow for TablesResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(TablesResult {
            schema_name: row.try_get(0)?,
            table_name: row.try_get(1)?,
            table_type: row.try_get_enum_value(2)?,
            comment: row.try_get(3)?,
        })
    }
}

impl FromPgChar for TableType {
    fn from_pg_char(c: char) -> crate::Result<Self> {
        match c {
            'r' | 'p' => Ok(TableType::Table),
            'v' | 'm' => Ok(TableType::View),
            _ => Err(MigrantToolsError::UnknownCatalogValue {
                kind: "relation kind",
                value: c.to_string(),
            }),
        }
    }
}

//language=postgresql
define_working_query!(get_tables, TablesResult, r#"
select ns.nspname, cl.relname, cl.relkind, des.description
from pg_class cl
         join pg_namespace ns on ns.oid = cl.relnamespace
         left join pg_description des on des.objoid = cl.oid and des.objsubid = 0
         left join pg_depend dep on dep.objid = ns.oid
where cl.relkind in ('r', 'p', 'v', 'm')
  and not cl.relispartition
  and ns.nspname not in ('pg_catalog', 'pg_toast', 'information_schema')
  and (dep.objid is null or dep.deptype <> 'e')
order by ns.nspname, cl.relname;
"#);
