use crate::models::{Identifier, Sequence, TypeCode, TypeDescriptor};

pub const DEFAULT_PRECISION: u32 = 38;
pub const DEFAULT_SCALE: u32 = 0;
pub const DEFAULT_RADIX: u32 = 10;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Column {
    pub name: Identifier,
    pub data_type: TypeDescriptor,
    pub size: Option<u32>,
    pub precision: u32,
    pub scale: u32,
    pub radix: u32,
    /// 1-based, assigned by the owning table.
    pub position: usize,
    pub is_nullable: bool,
    pub auto_increment: bool,
    /// The sequence backing an auto increment column, when the engine exposes one.
    pub sequence: Option<Sequence>,
    pub check: Option<String>,
    pub default_value: Option<String>,
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<Identifier>, data_type: TypeDescriptor) -> Self {
        Column {
            name: name.into(),
            data_type,
            size: None,
            precision: DEFAULT_PRECISION,
            scale: DEFAULT_SCALE,
            radix: DEFAULT_RADIX,
            position: 0,
            is_nullable: true,
            auto_increment: false,
            sequence: None,
            check: None,
            default_value: None,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn type_code(&self) -> TypeCode {
        self.data_type.code
    }
}
