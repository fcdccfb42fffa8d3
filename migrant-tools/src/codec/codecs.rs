use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use ordered_float::OrderedFloat;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;
use crate::codec::{Codec, CodecOptions, PortableValue};
use crate::connection::{Numeric, SqlValue};
use crate::models::{TypeCode, TypeDescriptor};
use crate::{MigrantToolsError, Result};

fn cannot_encode(value: &SqlValue, descriptor: &TypeDescriptor) -> MigrantToolsError {
    MigrantToolsError::InvalidValue {
        descriptor: descriptor.clone(),
        value: value.to_string(),
        reason: format!("a {} value cannot be stored in this column", value.kind()),
    }
}

fn invalid(value: &str, descriptor: &TypeDescriptor, reason: impl ToString) -> MigrantToolsError {
    MigrantToolsError::InvalidValue {
        descriptor: descriptor.clone(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn text<'a>(value: &'a PortableValue, descriptor: &TypeDescriptor) -> Result<&'a str> {
    value
        .as_text()
        .ok_or_else(|| invalid("<binary>", descriptor, "expected a textual value"))
}

#[derive(Debug)]
pub struct BooleanCodec;

impl Codec for BooleanCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        let b = match value {
            SqlValue::Bool(b) => *b,
            v => v.as_i64().map(|i| i != 0).ok_or_else(|| cannot_encode(v, descriptor))?,
        };
        Ok(PortableValue::Text(b.to_string()))
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        match s.trim().to_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Ok(SqlValue::Bool(true)),
            "false" | "f" | "0" | "no" => Ok(SqlValue::Bool(false)),
            _ => Err(invalid(s, descriptor, "not a boolean")),
        }
    }
}

#[derive(Debug)]
pub struct IntegerCodec;

impl Codec for IntegerCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        match value {
            SqlValue::Bool(b) => Ok(PortableValue::Text((*b as i64).to_string())),
            SqlValue::Numeric(n) => n
                .to_i64()
                .map(|i| PortableValue::Text(i.to_string()))
                .ok_or_else(|| cannot_encode(value, descriptor)),
            v => v
                .as_i64()
                .map(|i| PortableValue::Text(i.to_string()))
                .ok_or_else(|| cannot_encode(v, descriptor)),
        }
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        let i: i64 = s.trim().parse().map_err(|e| invalid(s, descriptor, e))?;

        Ok(match descriptor.code {
            TypeCode::TinyInt | TypeCode::SmallInt => SqlValue::SmallInt(i16::try_from(i).map_err(|e| invalid(s, descriptor, e))?),
            TypeCode::Integer => SqlValue::Int(i32::try_from(i).map_err(|e| invalid(s, descriptor, e))?),
            _ => SqlValue::BigInt(i),
        })
    }
}

#[derive(Debug)]
pub struct FloatCodec;

impl Codec for FloatCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        let s = match value {
            SqlValue::Real(f) => f.0.to_string(),
            SqlValue::Double(f) => f.0.to_string(),
            SqlValue::Numeric(d) => d.to_string(),
            v => v.as_i64().map(|i| i.to_string()).ok_or_else(|| cannot_encode(v, descriptor))?,
        };
        Ok(PortableValue::Text(s))
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        Ok(match descriptor.code {
            TypeCode::Real => SqlValue::Real(OrderedFloat(s.trim().parse().map_err(|e| invalid(s, descriptor, e))?)),
            _ => SqlValue::Double(OrderedFloat(s.trim().parse().map_err(|e| invalid(s, descriptor, e))?)),
        })
    }
}

#[derive(Debug)]
pub struct DecimalCodec;

impl Codec for DecimalCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        let s = match value {
            SqlValue::Numeric(n) => n.to_string(),
            SqlValue::Real(f) => f.0.to_string(),
            SqlValue::Double(f) => f.0.to_string(),
            v => v.as_i64().map(|i| i.to_string()).ok_or_else(|| cannot_encode(v, descriptor))?,
        };
        Ok(PortableValue::Text(s))
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        let n: Numeric = s.parse().map_err(|e| invalid(s, descriptor, e))?;
        Ok(SqlValue::Numeric(n))
    }
}

#[derive(Debug)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        match value {
            SqlValue::Text(s) => Ok(PortableValue::Text(s.clone())),
            SqlValue::Bytes(_) => Err(cannot_encode(value, descriptor)),
            v => Ok(PortableValue::Text(v.to_string())),
        }
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        Ok(SqlValue::Text(text(value, descriptor)?.to_string()))
    }
}

/// Keeps binary values binary. A textual value is read as base64.
#[derive(Debug)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        match value {
            SqlValue::Bytes(b) => Ok(PortableValue::Binary(b.clone())),
            SqlValue::Text(s) => Ok(PortableValue::Binary(Bytes::from(s.clone().into_bytes()))),
            v => Err(cannot_encode(v, descriptor)),
        }
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        match value {
            PortableValue::Binary(b) => Ok(SqlValue::Bytes(b.clone())),
            PortableValue::Text(s) => STANDARD
                .decode(s.trim())
                .map(|b| SqlValue::Bytes(Bytes::from(b)))
                .map_err(|e| invalid(s, descriptor, e)),
            PortableValue::Null => Ok(SqlValue::Null),
        }
    }
}

#[derive(Debug)]
pub struct DateCodec;

impl Codec for DateCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        let date = match value {
            SqlValue::Date(d) => *d,
            SqlValue::Timestamp(t) => t.date(),
            SqlValue::TimestampTz(t) => t.date(),
            v => return Err(cannot_encode(v, descriptor)),
        };

        let s = date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(|e| invalid(&date.to_string(), descriptor, e))?;
        Ok(PortableValue::Text(s))
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
            .map(SqlValue::Date)
            .map_err(|e| invalid(s, descriptor, e))
    }
}

#[derive(Debug)]
pub struct TimeCodec;

impl Codec for TimeCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        let time = match value {
            SqlValue::Time(t) => *t,
            SqlValue::Timestamp(t) => t.time(),
            v => return Err(cannot_encode(v, descriptor)),
        };

        let s = time
            .format(format_description!("[hour]:[minute]:[second].[subsecond]"))
            .map_err(|e| invalid(&time.to_string(), descriptor, e))?;
        Ok(PortableValue::Text(s))
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        Time::parse(s.trim(), format_description!("[hour]:[minute]:[second].[subsecond]"))
            .map(SqlValue::Time)
            .map_err(|e| invalid(s, descriptor, e))
    }
}

/// Timestamps without zone. With a time zone option the stored value is the UTC
/// instant of the local time.
#[derive(Debug)]
pub struct TimestampCodec;

impl Codec for TimestampCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, options: &CodecOptions) -> Result<PortableValue> {
        let timestamp = match (value, options.time_zone) {
            (SqlValue::Timestamp(t), None) => *t,
            (SqlValue::Timestamp(t), Some(zone)) => {
                let utc = t.assume_offset(zone).to_offset(UtcOffset::UTC);
                PrimitiveDateTime::new(utc.date(), utc.time())
            }
            (SqlValue::TimestampTz(t), _) => {
                let utc = t.to_offset(UtcOffset::UTC);
                PrimitiveDateTime::new(utc.date(), utc.time())
            }
            (SqlValue::Date(d), _) => d.midnight(),
            (v, _) => return Err(cannot_encode(v, descriptor)),
        };

        let s = timestamp
            .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"))
            .map_err(|e| invalid(&timestamp.to_string(), descriptor, e))?;
        Ok(PortableValue::Text(s))
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        let parsed = PrimitiveDateTime::parse(s.trim(), format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"))
            .map_err(|e| invalid(s, descriptor, e))?;

        Ok(SqlValue::Timestamp(match options.time_zone {
            Some(zone) => {
                let local = parsed.assume_utc().to_offset(zone);
                PrimitiveDateTime::new(local.date(), local.time())
            }
            None => parsed,
        }))
    }
}

#[derive(Debug)]
pub struct TimestampTzCodec;

impl Codec for TimestampTzCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, options: &CodecOptions) -> Result<PortableValue> {
        let timestamp = match value {
            SqlValue::TimestampTz(t) => *t,
            SqlValue::Timestamp(t) => t.assume_offset(options.time_zone.unwrap_or(UtcOffset::UTC)),
            v => return Err(cannot_encode(v, descriptor)),
        };

        let s = timestamp
            .format(&Rfc3339)
            .map_err(|e| invalid(&timestamp.to_string(), descriptor, e))?;
        Ok(PortableValue::Text(s))
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        let parsed = OffsetDateTime::parse(s.trim(), &Rfc3339).map_err(|e| invalid(s, descriptor, e))?;

        Ok(SqlValue::TimestampTz(match options.time_zone {
            Some(zone) => parsed.to_offset(zone),
            None => parsed,
        }))
    }
}

#[derive(Debug)]
pub struct UuidCodec;

impl Codec for UuidCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        match value {
            SqlValue::Uuid(u) => Ok(PortableValue::Text(u.hyphenated().to_string())),
            SqlValue::Text(s) => Ok(PortableValue::Text(s.clone())),
            v => Err(cannot_encode(v, descriptor)),
        }
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        Uuid::parse_str(s.trim())
            .map(SqlValue::Uuid)
            .map_err(|e| invalid(s, descriptor, e))
    }
}

#[derive(Debug)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<PortableValue> {
        match value {
            SqlValue::Json(v) => Ok(PortableValue::Text(v.to_string())),
            SqlValue::Text(s) => Ok(PortableValue::Text(s.clone())),
            v => Err(cannot_encode(v, descriptor)),
        }
    }

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, _options: &CodecOptions) -> Result<SqlValue> {
        let s = text(value, descriptor)?;
        serde_json::from_str(s)
            .map(SqlValue::Json)
            .map_err(|e| invalid(s, descriptor, e))
    }
}
