use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use bytes::Bytes;
use time::UtcOffset;
use crate::connection::SqlValue;
use crate::dialect::Dialect;
use crate::models::{TypeCode, TypeDescriptor};
use crate::{MigrantToolsError, Result};

mod codecs;
mod access;

pub use codecs::*;
pub use access::*;

/// A value in the form it is stored in a catalog.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PortableValue {
    Null,
    Text(String),
    Binary(Bytes),
}

impl PortableValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PortableValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Per value format options, handed to every encode and decode call.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct CodecOptions {
    /// Timestamps without a zone are read as local times in this zone and stored in UTC.
    pub time_zone: Option<UtcOffset>,
}

impl CodecOptions {
    pub fn with_time_zone(time_zone: UtcOffset) -> Self {
        CodecOptions {
            time_zone: Some(time_zone),
        }
    }
}

/// Converts non-null values between their engine form and their portable form.
pub trait Codec: Send + Sync + Debug {
    fn encode(&self, value: &SqlValue, descriptor: &TypeDescriptor, options: &CodecOptions) -> Result<PortableValue>;

    fn decode(&self, value: &PortableValue, descriptor: &TypeDescriptor, options: &CodecOptions) -> Result<SqlValue>;
}

/// Finds the codec for a column type.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<TypeDescriptor, Arc<dyn Codec>>,
    aliases: HashMap<TypeDescriptor, TypeDescriptor>,
    dialect: Option<Arc<dyn Dialect>>,
}

impl CodecRegistry {
    /// A registry without any codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a codec for every type family the crate moves.
    pub fn with_default_codecs() -> Self {
        let mut registry = Self::new();

        let boolean: Arc<dyn Codec> = Arc::new(BooleanCodec);
        let integer: Arc<dyn Codec> = Arc::new(IntegerCodec);
        let float: Arc<dyn Codec> = Arc::new(FloatCodec);
        let decimal: Arc<dyn Codec> = Arc::new(DecimalCodec);
        let text: Arc<dyn Codec> = Arc::new(TextCodec);
        let binary: Arc<dyn Codec> = Arc::new(BinaryCodec);

        for code in [TypeCode::Bit, TypeCode::Boolean] {
            registry.register(code.into(), boolean.clone());
        }
        for code in [TypeCode::TinyInt, TypeCode::SmallInt, TypeCode::Integer, TypeCode::BigInt] {
            registry.register(code.into(), integer.clone());
        }
        for code in [TypeCode::Real, TypeCode::Float, TypeCode::Double] {
            registry.register(code.into(), float.clone());
        }
        for code in [TypeCode::Numeric, TypeCode::Decimal] {
            registry.register(code.into(), decimal.clone());
        }
        for code in [TypeCode::Char, TypeCode::Varchar, TypeCode::LongVarchar, TypeCode::NChar, TypeCode::NVarchar, TypeCode::Clob] {
            registry.register(code.into(), text.clone());
        }
        for code in [TypeCode::Binary, TypeCode::Varbinary, TypeCode::LongVarbinary, TypeCode::Blob] {
            registry.register(code.into(), binary.clone());
        }

        registry.register(TypeCode::Date.into(), Arc::new(DateCodec));
        registry.register(TypeCode::Time.into(), Arc::new(TimeCodec));
        registry.register(TypeCode::Timestamp.into(), Arc::new(TimestampCodec));
        registry.register(TypeCode::TimestampWithTimeZone.into(), Arc::new(TimestampTzCodec));
        registry.register(TypeDescriptor::new(TypeCode::Other, "uuid"), Arc::new(UuidCodec));
        registry.register(TypeDescriptor::new(TypeCode::Other, "json"), Arc::new(JsonCodec));

        registry
    }

    /// Resolves engine specific type names through the aliases of this dialect.
    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn register(&mut self, descriptor: TypeDescriptor, codec: Arc<dyn Codec>) {
        self.codecs.insert(descriptor, codec);
    }

    pub fn register_alias(&mut self, alias: TypeDescriptor, canonical: TypeDescriptor) {
        self.aliases.insert(alias, canonical);
    }

    /// The descriptor codecs are looked up under.
    pub fn canonical(&self, descriptor: &TypeDescriptor) -> TypeDescriptor {
        self.dialect
            .as_ref()
            .and_then(|d| d.resolve_type_alias(descriptor))
            .or_else(|| self.aliases.get(descriptor).cloned())
            .unwrap_or_else(|| descriptor.clone())
    }

    /// Finds a codec by exact descriptor, then by type code alone.
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Result<Arc<dyn Codec>> {
        let canonical = self.canonical(descriptor);

        self.codecs
            .get(&canonical)
            .or_else(|| self.codecs.get(&canonical.without_name()))
            .cloned()
            .ok_or_else(|| MigrantToolsError::UnsupportedType(descriptor.clone()))
    }

    pub fn encode(&self, codec: &dyn Codec, value: &SqlValue, descriptor: &TypeDescriptor, options: &CodecOptions) -> Result<PortableValue> {
        if value.is_null() {
            return Ok(PortableValue::Null);
        }

        codec.encode(value, &self.canonical(descriptor), options)
    }

    /// Decodes into one slot of the target, writing nulls through the target's null path.
    pub fn decode(&self, codec: &dyn Codec, value: &PortableValue, descriptor: &TypeDescriptor, options: &CodecOptions, target: &mut dyn ParameterAccess, slot: usize) -> Result {
        match value {
            PortableValue::Null => target.set_null(slot, descriptor),
            value => {
                let decoded = codec.decode(value, &self.canonical(descriptor), options)?;
                target.set(slot, decoded)
            }
        }
    }

    /// Binds a column to its codec and slot.
    pub fn create_model(&self, name: &str, descriptor: &TypeDescriptor, slot: usize, options: CodecOptions) -> Result<ValueFormatModel> {
        Ok(ValueFormatModel {
            name: name.to_string(),
            descriptor: descriptor.clone(),
            canonical: self.canonical(descriptor),
            codec: self.resolve(descriptor)?,
            slot,
            options,
        })
    }
}

/// A column paired with its codec and the slot it is read from or written to.
#[derive(Debug, Clone)]
pub struct ValueFormatModel {
    pub name: String,
    pub descriptor: TypeDescriptor,
    canonical: TypeDescriptor,
    codec: Arc<dyn Codec>,
    pub slot: usize,
    pub options: CodecOptions,
}

impl ValueFormatModel {
    pub fn read(&self, source: &dyn ColumnAccess) -> Result<PortableValue> {
        let value = source.get(self.slot)?;
        if value.is_null() {
            return Ok(PortableValue::Null);
        }

        self.codec.encode(value, &self.canonical, &self.options)
    }

    pub fn write(&self, value: &PortableValue, target: &mut dyn ParameterAccess) -> Result {
        match value {
            PortableValue::Null => target.set_null(self.slot, &self.descriptor),
            value => {
                let decoded = self.codec.decode(value, &self.canonical, &self.options)?;
                target.set(self.slot, decoded)
            }
        }
    }
}
