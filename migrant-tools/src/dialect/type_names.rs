use std::collections::HashMap;
use crate::models::{Column, TypeCode, TypeDescriptor};

/// Templates for rendering native type names in DDL.
///
/// Templates may refer to the column size as `{N}`, precision as `{P}` and scale as `{S}`.
/// When a column has no size the unsized template is used, or a `({N})` group is
/// dropped from the sized one.
#[derive(Debug, Clone, Default)]
pub struct TypeNameMap {
    by_code: HashMap<TypeCode, TypeNameTemplate>,
    by_descriptor: HashMap<TypeDescriptor, TypeNameTemplate>,
}

#[derive(Debug, Clone)]
struct TypeNameTemplate {
    sized: String,
    unsized_name: Option<String>,
}

impl TypeNameTemplate {
    fn new(sized: &str, unsized_name: Option<&str>) -> Self {
        TypeNameTemplate {
            sized: sized.to_string(),
            unsized_name: unsized_name.map(|s| s.to_string()),
        }
    }
}

impl TypeNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(mut self, code: TypeCode, template: &str) -> Self {
        self.by_code.insert(code, TypeNameTemplate::new(template, None));
        self
    }

    /// Registers a template together with the one used when the column has no size.
    pub fn code_sized(mut self, code: TypeCode, sized: &str, unsized_name: &str) -> Self {
        self.by_code.insert(code, TypeNameTemplate::new(sized, Some(unsized_name)));
        self
    }

    /// Registers a template for one specific native type.
    pub fn descriptor(mut self, descriptor: TypeDescriptor, template: &str) -> Self {
        self.by_descriptor.insert(descriptor, TypeNameTemplate::new(template, None));
        self
    }

    pub fn render(&self, column: &Column) -> Option<String> {
        let template = self
            .by_descriptor
            .get(&column.data_type)
            .or_else(|| self.by_code.get(&column.data_type.code))?;

        let rendered = match (column.size, &template.unsized_name) {
            (Some(size), _) => template.sized.replace("{N}", &size.to_string()),
            (None, Some(unsized_name)) => unsized_name.clone(),
            (None, None) => template.sized.replace("({N})", "").replace("{N}", ""),
        };

        Some(
            rendered
                .replace("{P}", &column.precision.to_string())
                .replace("{S}", &column.scale.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders() {
        let map = TypeNameMap::new()
            .code(TypeCode::Varchar, "varchar({N})")
            .code(TypeCode::Numeric, "numeric({P}, {S})")
            .code_sized(TypeCode::Char, "char({N})", "text")
            .descriptor(TypeDescriptor::new(TypeCode::Other, "uuid"), "char(36)");

        let varchar = Column::new("name", TypeCode::Varchar.into()).with_size(40);
        assert_eq!(map.render(&varchar).as_deref(), Some("varchar(40)"));

        let unsized_varchar = Column::new("name", TypeCode::Varchar.into());
        assert_eq!(map.render(&unsized_varchar).as_deref(), Some("varchar"));

        let unsized_char = Column::new("code", TypeCode::Char.into());
        assert_eq!(map.render(&unsized_char).as_deref(), Some("text"));

        let numeric = Column::new("price", TypeCode::Numeric.into()).with_precision(12, 2);
        assert_eq!(map.render(&numeric).as_deref(), Some("numeric(12, 2)"));

        let uuid = Column::new("id", TypeDescriptor::new(TypeCode::Other, "uuid"));
        assert_eq!(map.render(&uuid).as_deref(), Some("char(36)"));

        let json = Column::new("doc", TypeDescriptor::new(TypeCode::Other, "json"));
        assert_eq!(map.render(&json), None);
    }
}
