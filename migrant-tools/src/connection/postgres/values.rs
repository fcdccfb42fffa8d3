use std::error::Error;
use bytes::{Bytes, BytesMut};
use ordered_float::OrderedFloat;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use tokio_postgres::Row;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use uuid::Uuid;
use crate::connection::{Numeric, SqlValue};
use crate::models::{TypeCode, TypeDescriptor};
use crate::{MigrantToolsError, Result};

type BoxError = Box<dyn Error + Sync + Send>;

/// Maps a Postgres type name, as found in `pg_type.typname`, to a descriptor.
pub(crate) fn descriptor_for_type_name(name: &str) -> TypeDescriptor {
    let code = match name {
        "bool" => TypeCode::Boolean,
        "int2" => TypeCode::SmallInt,
        "int4" | "oid" => TypeCode::Integer,
        "int8" => TypeCode::BigInt,
        "float4" => TypeCode::Real,
        "float8" => TypeCode::Double,
        "numeric" => TypeCode::Numeric,
        "bpchar" | "char" => TypeCode::Char,
        "varchar" | "name" => TypeCode::Varchar,
        "text" => TypeCode::LongVarchar,
        "bytea" => TypeCode::LongVarbinary,
        "bit" | "varbit" => TypeCode::Bit,
        "date" => TypeCode::Date,
        "time" => TypeCode::Time,
        "timetz" => TypeCode::TimeWithTimeZone,
        "timestamp" => TypeCode::Timestamp,
        "timestamptz" => TypeCode::TimestampWithTimeZone,
        _ => TypeCode::Other,
    };

    TypeDescriptor::new(code, name)
}

fn get<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>> {
    Ok(row.try_get::<_, Option<T>>(idx)?)
}

/// Reads one column of a row into the engine independent value model.
pub(crate) fn read_value(row: &Row, idx: usize) -> Result<SqlValue> {
    let ty = row.columns()[idx].type_();

    let value = match ty.name() {
        "bool" => get::<bool>(row, idx)?.map(SqlValue::Bool),
        "int2" => get::<i16>(row, idx)?.map(SqlValue::SmallInt),
        "int4" => get::<i32>(row, idx)?.map(SqlValue::Int),
        "oid" => get::<u32>(row, idx)?.map(|v| SqlValue::BigInt(v as i64)),
        "int8" => get::<i64>(row, idx)?.map(SqlValue::BigInt),
        "float4" => get::<f32>(row, idx)?.map(|v| SqlValue::Real(OrderedFloat(v))),
        "float8" => get::<f64>(row, idx)?.map(|v| SqlValue::Double(OrderedFloat(v))),
        "numeric" => get::<Numeric>(row, idx)?.map(SqlValue::Numeric),
        "text" | "varchar" | "bpchar" | "name" | "citext" => get::<String>(row, idx)?.map(SqlValue::Text),
        "bytea" => get::<Vec<u8>>(row, idx)?.map(|v| SqlValue::Bytes(Bytes::from(v))),
        "date" => get::<Date>(row, idx)?.map(SqlValue::Date),
        "time" => get::<Time>(row, idx)?.map(SqlValue::Time),
        "timestamp" => get::<PrimitiveDateTime>(row, idx)?.map(SqlValue::Timestamp),
        "timestamptz" => get::<OffsetDateTime>(row, idx)?.map(SqlValue::TimestampTz),
        "uuid" => get::<Uuid>(row, idx)?.map(SqlValue::Uuid),
        "json" | "jsonb" => get::<serde_json::Value>(row, idx)?.map(SqlValue::Json),
        other => return Err(MigrantToolsError::UnsupportedType(descriptor_for_type_name(other))),
    };

    Ok(value.unwrap_or(SqlValue::Null))
}

fn is_text(ty: &Type) -> bool {
    matches!(ty.name(), "text" | "varchar" | "bpchar" | "name" | "citext")
}

fn write_integer(value: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match ty.name() {
        "int2" => i16::try_from(value)?.to_sql(ty, out),
        "int4" => i32::try_from(value)?.to_sql(ty, out),
        "int8" => value.to_sql(ty, out),
        "oid" => u32::try_from(value)?.to_sql(ty, out),
        "float4" => (value as f32).to_sql(ty, out),
        "float8" => (value as f64).to_sql(ty, out),
        "numeric" => Numeric::from(value).to_sql(ty, out),
        "bool" => (value != 0).to_sql(ty, out),
        _ if is_text(ty) => value.to_string().to_sql(ty, out),
        other => Err(format!("cannot bind an integer to a parameter of type {}", other).into()),
    }
}

fn write_float(value: f64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match ty.name() {
        "float4" => (value as f32).to_sql(ty, out),
        "float8" => value.to_sql(ty, out),
        "numeric" => Numeric::from_f64(value).to_sql(ty, out),
        _ if is_text(ty) => value.to_string().to_sql(ty, out),
        other => Err(format!("cannot bind a float to a parameter of type {}", other).into()),
    }
}

fn write_text(value: &str, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match ty.name() {
        _ if is_text(ty) => value.to_sql(ty, out),
        "int2" | "int4" | "int8" | "oid" => write_integer(value.trim().parse()?, ty, out),
        "float4" | "float8" => write_float(value.trim().parse()?, ty, out),
        "numeric" => value.parse::<Numeric>()?.to_sql(ty, out),
        "bool" => match value.trim() {
            "t" | "true" | "1" => true.to_sql(ty, out),
            "f" | "false" | "0" => false.to_sql(ty, out),
            other => Err(format!("`{}` is not a boolean", other).into()),
        },
        "uuid" => Uuid::parse_str(value.trim())?.to_sql(ty, out),
        "json" | "jsonb" => serde_json::from_str::<serde_json::Value>(value)?.to_sql(ty, out),
        other => Err(format!("cannot bind text to a parameter of type {}", other).into()),
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => match ty.name() {
                "bool" => v.to_sql(ty, out),
                _ => write_integer(*v as i64, ty, out),
            },
            SqlValue::SmallInt(v) => write_integer(*v as i64, ty, out),
            SqlValue::Int(v) => write_integer(*v as i64, ty, out),
            SqlValue::BigInt(v) => write_integer(*v, ty, out),
            SqlValue::Real(v) if ty.name() == "float4" => v.0.to_sql(ty, out),
            SqlValue::Real(v) => write_float(v.0 as f64, ty, out),
            SqlValue::Double(v) => write_float(v.0, ty, out),
            SqlValue::Numeric(v) => match ty.name() {
                "float4" | "float8" => write_float(v.to_f64(), ty, out),
                "int2" | "int4" | "int8" => write_integer(v.to_i64().ok_or("numeric out of range")?, ty, out),
                _ if is_text(ty) => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::Text(v) => write_text(v, ty, out),
            SqlValue::Bytes(v) => v.as_ref().to_sql(ty, out),
            SqlValue::Date(v) => v.to_sql(ty, out),
            SqlValue::Time(v) => v.to_sql(ty, out),
            SqlValue::Timestamp(v) => match ty.name() {
                "timestamptz" => v.assume_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            SqlValue::TimestampTz(v) => match ty.name() {
                "timestamp" => {
                    let utc = v.to_offset(UtcOffset::UTC);
                    PrimitiveDateTime::new(utc.date(), utc.time()).to_sql(ty, out)
                }
                _ => v.to_sql(ty, out),
            },
            SqlValue::Uuid(v) if is_text(ty) => v.to_string().to_sql(ty, out),
            SqlValue::Uuid(v) => v.to_sql(ty, out),
            SqlValue::Json(v) if is_text(ty) => v.to_string().to_sql(ty, out),
            SqlValue::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_type_names() {
        assert_eq!(descriptor_for_type_name("int4"), TypeDescriptor::new(TypeCode::Integer, "int4"));
        assert_eq!(descriptor_for_type_name("timestamptz").code, TypeCode::TimestampWithTimeZone);
        assert_eq!(descriptor_for_type_name("jsonb"), TypeDescriptor::new(TypeCode::Other, "jsonb"));
    }

    #[test]
    fn coerces_integers_towards_parameter_type() {
        let mut out = BytesMut::new();
        SqlValue::BigInt(7).to_sql(&Type::INT2, &mut out).unwrap();
        assert_eq!(out.as_ref(), &[0, 7]);

        let mut out = BytesMut::new();
        assert!(SqlValue::BigInt(100_000).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn parses_text_for_typed_parameters() {
        let mut out = BytesMut::new();
        SqlValue::Text("42".to_string()).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(out.as_ref(), &[0, 0, 0, 42]);

        let mut out = BytesMut::new();
        assert!(SqlValue::Text("nope".to_string()).to_sql(&Type::BOOL, &mut out).is_err());
    }
}
