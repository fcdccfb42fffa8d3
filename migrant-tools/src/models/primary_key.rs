use crate::models::Identifier;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PrimaryKey {
    pub name: Option<Identifier>,
    pub columns: Vec<Identifier>,
}

impl PrimaryKey {
    pub fn new<I: Into<Identifier>>(columns: impl IntoIterator<Item = I>) -> Self {
        PrimaryKey {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn named(mut self, name: impl Into<Identifier>) -> Self {
        self.name = Some(name.into());
        self
    }
}
