use crate::models::Identifier;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Index {
    pub name: Option<Identifier>,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    /// Set for the index backing the primary key. Those are scripted as part of the key.
    pub primary: bool,
    pub predicate: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IndexColumn {
    pub name: Identifier,
    pub descending: bool,
}

impl Index {
    pub fn new<I: Into<Identifier>>(columns: impl IntoIterator<Item = I>) -> Self {
        Index {
            name: None,
            columns: columns
                .into_iter()
                .map(|c| IndexColumn {
                    name: c.into(),
                    descending: false,
                })
                .collect(),
            unique: false,
            primary: false,
            predicate: None,
        }
    }

    pub fn named(mut self, name: impl Into<Identifier>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
