use std::collections::HashMap;
use time::UtcOffset;
use crate::dialect::{format_offset, Capabilities, Dialect, TypeNameMap};
use crate::models::{TableRef, TypeCode, TypeDescriptor};
use crate::quoting::{quote_value_string, IdentifierCase, IdentifierQuoter};
use crate::Result;

const RESERVED_WORDS: &[&str] = &[
    "add", "all", "alter", "and", "as", "asc", "before", "between", "by", "case", "change", "check",
    "column", "condition", "constraint", "create", "cross", "database", "default", "delete", "desc",
    "distinct", "drop", "else", "exists", "false", "for", "foreign", "from", "group", "having", "in",
    "index", "inner", "insert", "interval", "into", "is", "join", "key", "keys", "left", "like",
    "limit", "lock", "match", "not", "null", "on", "option", "or", "order", "outer", "primary",
    "range", "references", "rename", "replace", "right", "select", "set", "show", "table", "then",
    "to", "trigger", "true", "union", "unique", "update", "usage", "use", "using", "values", "when",
    "where", "with",
];

#[derive(Debug, Clone)]
pub struct MySqlDialect {
    capabilities: Capabilities,
    quoter: IdentifierQuoter,
    type_names: TypeNameMap,
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlDialect {
    pub fn new() -> Self {
        MySqlDialect {
            capabilities: Capabilities {
                sequences: false,
                index_in_create_table: true,
                drop_constraints: true,
                session_time_zone: true,
                with_time_zone: false,
                limit_offset: true,
                if_exists: true,
                catalogs: true,
                schemas: false,
                approximate_row_count: true,
            },
            quoter: IdentifierQuoter::new('`', '`', IdentifierCase::Mixed, HashMap::new())
                .with_reserved_words(RESERVED_WORDS.iter().copied()),
            type_names: TypeNameMap::new()
                .code(TypeCode::Bit, "bit({N})")
                .code(TypeCode::Boolean, "boolean")
                .code(TypeCode::TinyInt, "tinyint")
                .code(TypeCode::SmallInt, "smallint")
                .code(TypeCode::Integer, "int")
                .code(TypeCode::BigInt, "bigint")
                .code(TypeCode::Real, "float")
                .code(TypeCode::Float, "double")
                .code(TypeCode::Double, "double")
                .code(TypeCode::Numeric, "decimal({P}, {S})")
                .code(TypeCode::Decimal, "decimal({P}, {S})")
                .code_sized(TypeCode::Char, "char({N})", "char(1)")
                .code_sized(TypeCode::Varchar, "varchar({N})", "longtext")
                .code(TypeCode::LongVarchar, "longtext")
                .code_sized(TypeCode::NChar, "nchar({N})", "nchar(1)")
                .code_sized(TypeCode::NVarchar, "nvarchar({N})", "longtext")
                .code(TypeCode::Clob, "longtext")
                .code_sized(TypeCode::Binary, "binary({N})", "longblob")
                .code_sized(TypeCode::Varbinary, "varbinary({N})", "longblob")
                .code(TypeCode::LongVarbinary, "longblob")
                .code(TypeCode::Blob, "longblob")
                .code(TypeCode::Date, "date")
                .code(TypeCode::Time, "time")
                .code(TypeCode::TimeWithTimeZone, "time")
                .code(TypeCode::Timestamp, "datetime(6)")
                .code(TypeCode::TimestampWithTimeZone, "timestamp(6)")
                .descriptor(TypeDescriptor::new(TypeCode::Other, "uuid"), "char(36)")
                .descriptor(TypeDescriptor::new(TypeCode::Other, "json"), "json"),
        }
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn quoter(&self) -> &IdentifierQuoter {
        &self.quoter
    }

    fn type_names(&self) -> &TypeNameMap {
        &self.type_names
    }

    fn resolve_type_alias(&self, descriptor: &TypeDescriptor) -> Option<TypeDescriptor> {
        if descriptor.code != TypeCode::Other {
            return None;
        }

        match descriptor.name.as_deref()? {
            "year" => Some(TypeDescriptor::of_code(TypeCode::SmallInt)),
            "enum" | "set" => Some(TypeDescriptor::of_code(TypeCode::Varchar)),
            _ => None,
        }
    }

    fn limit_offset_clause(&self, limit: Option<u64>, offset: u64) -> Result<String> {
        // An offset is only accepted after a limit.
        Ok(match (limit, offset) {
            (Some(limit), 0) => format!(" limit {}", limit),
            (Some(limit), offset) => format!(" limit {} offset {}", limit, offset),
            (None, 0) => String::new(),
            (None, offset) => format!(" limit {} offset {}", u64::MAX, offset),
        })
    }

    fn identity_clause(&self) -> Option<&str> {
        Some("auto_increment")
    }

    fn drop_foreign_key_sql(&self, table: &TableRef, name: &str) -> String {
        format!("alter table {} drop foreign key {}", self.qualify(table), self.quote(name))
    }

    fn drop_index_sql(&self, table: &TableRef, name: &str) -> String {
        format!("drop index {} on {}", self.quote(name), self.qualify(table))
    }

    fn drop_trigger_sql(&self, table: &TableRef, name: &str) -> String {
        format!(
            "drop trigger {}{}",
            self.if_exists(),
            self.qualify_name(table.catalog.as_ref(), None, name)
        )
    }

    fn session_time_zone_sql(&self, offset: UtcOffset) -> Option<String> {
        Some(format!("set time_zone = '{}'", format_offset(offset)))
    }

    fn approximate_row_count_sql(&self, table: &TableRef) -> Option<String> {
        let schema_filter = match &table.catalog {
            Some(catalog) => quote_value_string(catalog.value()),
            None => "database()".to_string(),
        };

        Some(format!(
            "select coalesce(table_rows, 0) from information_schema.tables where table_schema = {} and table_name = {}",
            schema_filter,
            quote_value_string(table.table.value())
        ))
    }
}
