use tokio_postgres::Row;
use crate::connection::{FromPgChar, FromRow, RowEnumExt};
use crate::models::ReferenceAction;
use crate::schema_reader::define_working_query;
use crate::MigrantToolsError;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ForeignKeyResult {
    pub constraint_name: String,
    pub source_table_name: String,
    pub source_schema_name: String,
    pub target_table_name: String,
    pub target_schema_name: String,
    pub update_action: ReferenceAction,
    pub delete_action: ReferenceAction,
}

impl FromRow for ForeignKeyResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(Self {
            constraint_name: row.try_get(0)?,
            source_table_name: row.try_get(1)?,
            source_schema_name: row.try_get(2)?,
            target_table_name: row.try_get(3)?,
            target_schema_name: row.try_get(4)?,
            update_action: row.try_get_enum_value(5)?,
            delete_action: row.try_get_enum_value(6)?,
        })
    }
}

impl FromPgChar for ReferenceAction {
    fn from_pg_char(c: char) -> crate::Result<Self> {
        match c {
            'a' => Ok(ReferenceAction::NoAction),
            'r' => Ok(ReferenceAction::Restrict),
            'c' => Ok(ReferenceAction::Cascade),
            'n' => Ok(ReferenceAction::SetNull),
            'd' => Ok(ReferenceAction::SetDefault),
            _ => Err(MigrantToolsError::UnknownCatalogValue {
                kind: "foreign key action",
                value: c.to_string(),
            }),
        }
    }
}

//language=postgresql
define_working_query!(get_foreign_keys, ForeignKeyResult, r#"
select con.conname              as constraint_name,
       tab.relname              as source_table_name,
       tab_ns.nspname           as source_schema_name,
       target.relname           as target_table_name,
       target_ns.nspname        as target_schema_name,
       con.confupdtype          as update_action,
       con.confdeltype          as delete_action
from pg_catalog.pg_constraint con
         join pg_catalog.pg_class tab on con.conrelid = tab.oid
         left join pg_namespace tab_ns on tab_ns.oid = tab.relnamespace
         join pg_catalog.pg_class target on con.confrelid = target.oid
         left join pg_namespace target_ns on target_ns.oid = target.relnamespace
where con.contype = 'f'
  and tab.oid > 16384
order by source_schema_name, source_table_name, constraint_name;"#);
