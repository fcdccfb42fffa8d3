use tokio_postgres::Row;
use crate::connection::FromRow;
use crate::schema_reader::define_working_query;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SequenceResult {
    pub schema_name: String,
    pub sequence_name: String,
    pub start_value: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub increment_by: i64,
    pub cycle: bool,
    pub cache_size: i64,
    pub last_value: Option<i64>,
    pub owner_schema_name: Option<String>,
    pub owner_table_name: Option<String>,
    pub owner_column_name: Option<String>,
}

impl FromRow for SequenceResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(Self {
            schema_name: row.try_get(0)?,
            sequence_name: row.try_get(1)?,
            start_value: row.try_get(2)?,
            min_value: row.try_get(3)?,
            max_value: row.try_get(4)?,
            increment_by: row.try_get(5)?,
            cycle: row.try_get(6)?,
            cache_size: row.try_get(7)?,
            last_value: row.try_get(8)?,
            owner_schema_name: row.try_get(9)?,
            owner_table_name: row.try_get(10)?,
            owner_column_name: row.try_get(11)?,
        })
    }
}

// Sequences backing identity columns are recreated with their column and skipped here.
//language=postgresql
define_working_query!(get_sequences, SequenceResult, r#"
SELECT n.nspname                   AS schemaname,
       c.relname                   AS sequencename,
       s.seqstart                  AS start_value,
       s.seqmin                    AS min_value,
       s.seqmax                    AS max_value,
       s.seqincrement              AS increment_by,
       s.seqcycle                  AS cycle,
       s.seqcache                  AS cache_size,
       CASE
           WHEN has_sequence_privilege(c.oid, 'SELECT,USAGE'::text) THEN pg_sequence_last_value(c.oid::regclass)
           ELSE NULL::bigint
           END                     AS last_value,
       owner_ns.nspname            AS owner_schema_name,
       owner_table.relname         AS owner_table_name,
       owner_attr.attname          AS owner_column_name
FROM pg_sequence s
         JOIN pg_class c ON c.oid = s.seqrelid
         LEFT JOIN pg_namespace n ON n.oid = c.relnamespace
         left join pg_depend dep on dep.objid = n.oid
         left join pg_depend owner_dep on owner_dep.objid = c.oid
                                      and owner_dep.classid = 'pg_class'::regclass
                                      and owner_dep.refclassid = 'pg_class'::regclass
                                      and owner_dep.deptype in ('a', 'i')
         left join pg_class owner_table on owner_table.oid = owner_dep.refobjid
         left join pg_namespace owner_ns on owner_ns.oid = owner_table.relnamespace
         left join pg_attribute owner_attr on owner_attr.attrelid = owner_dep.refobjid
                                          and owner_attr.attnum = owner_dep.refobjsubid
WHERE NOT pg_is_other_temp_schema(n.oid)
  AND c.relkind = 'S'::"char"
  and c.oid > 16384
  and (dep.objid is null or dep.deptype <> 'e')
  and (owner_dep.deptype is null or owner_dep.deptype <> 'i')
order by schemaname, sequencename
"#);
