use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Engine independent family of a column type.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCode {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    Clob,
    Binary,
    Varbinary,
    LongVarbinary,
    Blob,
    Date,
    Time,
    TimeWithTimeZone,
    Timestamp,
    TimestampWithTimeZone,
    Other,
}

impl TypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCode::Bit => "bit",
            TypeCode::Boolean => "boolean",
            TypeCode::TinyInt => "tinyint",
            TypeCode::SmallInt => "smallint",
            TypeCode::Integer => "integer",
            TypeCode::BigInt => "bigint",
            TypeCode::Real => "real",
            TypeCode::Float => "float",
            TypeCode::Double => "double",
            TypeCode::Numeric => "numeric",
            TypeCode::Decimal => "decimal",
            TypeCode::Char => "char",
            TypeCode::Varchar => "varchar",
            TypeCode::LongVarchar => "long_varchar",
            TypeCode::NChar => "nchar",
            TypeCode::NVarchar => "nvarchar",
            TypeCode::Clob => "clob",
            TypeCode::Binary => "binary",
            TypeCode::Varbinary => "varbinary",
            TypeCode::LongVarbinary => "long_varbinary",
            TypeCode::Blob => "blob",
            TypeCode::Date => "date",
            TypeCode::Time => "time",
            TypeCode::TimeWithTimeZone => "time_with_time_zone",
            TypeCode::Timestamp => "timestamp",
            TypeCode::TimestampWithTimeZone => "timestamp_with_time_zone",
            TypeCode::Other => "other",
        }
    }
}

impl Display for TypeCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (type code, type name) pair identifying the native type of a column.
///
/// Descriptors are equal only when both parts match. The name is kept lower case, and
/// a descriptor without a name stands for every type of its code.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub code: TypeCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TypeDescriptor {
    pub fn new(code: TypeCode, name: impl AsRef<str>) -> Self {
        TypeDescriptor {
            code,
            name: Some(name.as_ref().to_lowercase()),
        }
    }

    pub fn of_code(code: TypeCode) -> Self {
        TypeDescriptor { code, name: None }
    }

    /// The same descriptor with the type name dropped.
    pub fn without_name(&self) -> Self {
        TypeDescriptor::of_code(self.code)
    }
}

impl From<TypeCode> for TypeDescriptor {
    fn from(value: TypeCode) -> Self {
        TypeDescriptor::of_code(value)
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.code, name),
            None => write!(f, "{}", self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_only_when_code_and_name_match() {
        assert_eq!(TypeDescriptor::new(TypeCode::Varchar, "TEXT"), TypeDescriptor::new(TypeCode::Varchar, "text"));
        assert_ne!(TypeDescriptor::new(TypeCode::Varchar, "text"), TypeDescriptor::new(TypeCode::Clob, "text"));
        assert_ne!(TypeDescriptor::new(TypeCode::Varchar, "text"), TypeDescriptor::of_code(TypeCode::Varchar));
    }

    #[test]
    fn displays_code_and_name() {
        assert_eq!(TypeDescriptor::new(TypeCode::Integer, "int4").to_string(), "integer (int4)");
        assert_eq!(TypeDescriptor::of_code(TypeCode::BigInt).to_string(), "bigint");
    }
}
