use std::collections::HashMap;
use time::UtcOffset;
use tracing::instrument;
use crate::connection::PostgresClientWrapper;
use crate::dialect::{format_offset, Capabilities, Dialect, TypeNameMap};
use crate::models::{TableRef, TypeCode, TypeDescriptor};
use crate::quoting::{quote_value_string, AllowedKeywordUsage, IdentifierCase, IdentifierQuoter};
use crate::Result;

/// Words reserved by every supported server version. Refreshed from the server with
/// [`PostgresDialect::load_keywords`].
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both", "case", "cast",
    "check", "collate", "column", "constraint", "create", "current_catalog", "current_date",
    "current_role", "current_time", "current_timestamp", "current_user", "default", "deferrable",
    "desc", "distinct", "do", "else", "end", "except", "false", "fetch", "for", "foreign", "from",
    "grant", "group", "having", "in", "initially", "intersect", "into", "lateral", "leading", "limit",
    "localtime", "localtimestamp", "not", "null", "offset", "on", "only", "or", "order", "placing",
    "primary", "references", "returning", "select", "session_user", "some", "symmetric", "table",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic", "when", "where",
    "window", "with",
];

#[derive(Debug, Clone)]
pub struct PostgresDialect {
    capabilities: Capabilities,
    quoter: IdentifierQuoter,
    type_names: TypeNameMap,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresDialect {
    pub fn new() -> Self {
        PostgresDialect {
            capabilities: Capabilities {
                sequences: true,
                index_in_create_table: false,
                drop_constraints: true,
                session_time_zone: true,
                with_time_zone: true,
                limit_offset: true,
                if_exists: true,
                catalogs: false,
                schemas: true,
                approximate_row_count: true,
            },
            quoter: IdentifierQuoter::new('"', '"', IdentifierCase::Lower, HashMap::new())
                .with_reserved_words(RESERVED_WORDS.iter().copied()),
            type_names: TypeNameMap::new()
                .code(TypeCode::Bit, "bit({N})")
                .code(TypeCode::Boolean, "boolean")
                .code(TypeCode::TinyInt, "smallint")
                .code(TypeCode::SmallInt, "smallint")
                .code(TypeCode::Integer, "integer")
                .code(TypeCode::BigInt, "bigint")
                .code(TypeCode::Real, "real")
                .code(TypeCode::Float, "double precision")
                .code(TypeCode::Double, "double precision")
                .code(TypeCode::Numeric, "numeric({P}, {S})")
                .code(TypeCode::Decimal, "numeric({P}, {S})")
                .code(TypeCode::Char, "char({N})")
                .code(TypeCode::Varchar, "varchar({N})")
                .code(TypeCode::LongVarchar, "text")
                .code(TypeCode::NChar, "char({N})")
                .code(TypeCode::NVarchar, "varchar({N})")
                .code(TypeCode::Clob, "text")
                .code(TypeCode::Binary, "bytea")
                .code(TypeCode::Varbinary, "bytea")
                .code(TypeCode::LongVarbinary, "bytea")
                .code(TypeCode::Blob, "bytea")
                .code(TypeCode::Date, "date")
                .code(TypeCode::Time, "time")
                .code(TypeCode::TimeWithTimeZone, "time with time zone")
                .code(TypeCode::Timestamp, "timestamp")
                .code(TypeCode::TimestampWithTimeZone, "timestamp with time zone")
                .descriptor(TypeDescriptor::new(TypeCode::Other, "uuid"), "uuid")
                .descriptor(TypeDescriptor::new(TypeCode::Other, "json"), "json")
                .descriptor(TypeDescriptor::new(TypeCode::Other, "jsonb"), "jsonb"),
        }
    }

    /// Replaces the built in keyword list with the one the server reports.
    #[instrument(skip_all)]
    pub async fn load_keywords(&mut self, connection: &PostgresClientWrapper) -> Result {
        let keywords: Vec<(String, i8)> = connection
            .get_results("select word, catcode from pg_get_keywords() where catcode <> 'U'")
            .await?;

        let keywords = keywords
            .into_iter()
            .map(|(word, catcode)| {
                let usage = match catcode as u8 as char {
                    'C' => AllowedKeywordUsage {
                        column_name: true,
                        type_or_function_name: false,
                    },
                    'T' => AllowedKeywordUsage {
                        column_name: false,
                        type_or_function_name: true,
                    },
                    _ => AllowedKeywordUsage::RESERVED,
                };
                (word, usage)
            })
            .collect();

        self.quoter.set_keywords(keywords);
        Ok(())
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
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
            "jsonb" => Some(TypeDescriptor::new(TypeCode::Other, "json")),
            "citext" | "inet" | "cidr" | "macaddr" => Some(TypeDescriptor::of_code(TypeCode::Varchar)),
            "money" => Some(TypeDescriptor::of_code(TypeCode::Numeric)),
            _ => None,
        }
    }

    fn parameter_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn session_time_zone_sql(&self, offset: UtcOffset) -> Option<String> {
        Some(format!("set time zone '{}'", format_offset(offset)))
    }

    fn approximate_row_count_sql(&self, table: &TableRef) -> Option<String> {
        let schema = table.schema.as_ref().map(|s| s.value()).unwrap_or("public");
        Some(format!(
            "select greatest(c.reltuples, 0)::bigint from pg_class c join pg_namespace n on n.oid = c.relnamespace where n.nspname = {} and c.relname = {}",
            quote_value_string(schema),
            quote_value_string(table.table.value())
        ))
    }
}
