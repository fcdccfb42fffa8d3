use std::collections::HashMap;
use crate::dialect::{Capabilities, Dialect, TypeNameMap};
use crate::models::TypeCode;
use crate::quoting::{IdentifierCase, IdentifierQuoter};
use crate::{MigrantToolsError, Result};

/// ANSI SQL without engine specific extensions.
///
/// The capabilities can be adjusted, which makes this the dialect of choice for engines
/// without a dedicated implementation.
#[derive(Debug, Clone)]
pub struct GenericDialect {
    capabilities: Capabilities,
    quoter: IdentifierQuoter,
    type_names: TypeNameMap,
}

impl Default for GenericDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericDialect {
    pub fn new() -> Self {
        GenericDialect {
            capabilities: Capabilities::default(),
            quoter: IdentifierQuoter::new('"', '"', IdentifierCase::Upper, HashMap::new())
                .with_reserved_words(["select", "from", "where", "table", "order", "group", "user", "check", "primary", "references"]),
            type_names: TypeNameMap::new()
                .code(TypeCode::Bit, "bit({N})")
                .code(TypeCode::Boolean, "boolean")
                .code(TypeCode::TinyInt, "smallint")
                .code(TypeCode::SmallInt, "smallint")
                .code(TypeCode::Integer, "integer")
                .code(TypeCode::BigInt, "bigint")
                .code(TypeCode::Real, "real")
                .code(TypeCode::Float, "float")
                .code(TypeCode::Double, "double precision")
                .code(TypeCode::Numeric, "numeric({P}, {S})")
                .code(TypeCode::Decimal, "decimal({P}, {S})")
                .code(TypeCode::Char, "char({N})")
                .code_sized(TypeCode::Varchar, "varchar({N})", "clob")
                .code(TypeCode::LongVarchar, "clob")
                .code(TypeCode::NChar, "nchar({N})")
                .code_sized(TypeCode::NVarchar, "nvarchar({N})", "nclob")
                .code(TypeCode::Clob, "clob")
                .code(TypeCode::Binary, "binary({N})")
                .code_sized(TypeCode::Varbinary, "varbinary({N})", "blob")
                .code(TypeCode::LongVarbinary, "blob")
                .code(TypeCode::Blob, "blob")
                .code(TypeCode::Date, "date")
                .code(TypeCode::Time, "time")
                .code(TypeCode::TimeWithTimeZone, "time with time zone")
                .code(TypeCode::Timestamp, "timestamp")
                .code(TypeCode::TimestampWithTimeZone, "timestamp with time zone"),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &str {
        "generic"
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

    fn limit_offset_clause(&self, limit: Option<u64>, offset: u64) -> Result<String> {
        if !self.supports_limit_offset() {
            return Err(MigrantToolsError::DialectCapability {
                dialect: self.name().to_string(),
                capability: "limit and offset".to_string(),
            });
        }

        let mut sql = format!(" offset {} rows", offset);
        if let Some(limit) = limit {
            sql.push_str(&format!(" fetch next {} rows only", limit));
        }
        Ok(sql)
    }
}
