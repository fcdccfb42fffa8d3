use itertools::Itertools;
use crate::models::{ForeignKey, Identifier, Index, Sequence, Table, Trigger};

/// How the parts of a generated name are cased.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NameCasing {
    /// `seq_orders_id`
    Lower,
    /// `Seq_Orders_Id`
    Capitalized,
    /// `SEQ_ORDERS_ID`
    Upper,
}

impl NameCasing {
    /// Infers the casing from the letters of a name. Mixed case that is not capitalized
    /// falls back to upper case.
    pub fn infer(name: &str) -> Self {
        let has_lower = name.chars().any(|c| c.is_lowercase());
        let has_upper = name.chars().any(|c| c.is_uppercase());

        if !has_upper {
            return NameCasing::Lower;
        }
        if !has_lower {
            return NameCasing::Upper;
        }

        let capitalized = name
            .split(NamingStrategy::DELIMITER)
            .filter(|part| part.chars().any(|c| c.is_alphabetic()))
            .all(|part| part.chars().find(|c| c.is_alphabetic()).is_some_and(|c| c.is_uppercase()));

        if capitalized {
            NameCasing::Capitalized
        } else {
            NameCasing::Upper
        }
    }

    fn apply(&self, part: &str) -> String {
        match self {
            NameCasing::Lower => part.to_lowercase(),
            NameCasing::Upper => part.to_uppercase(),
            NameCasing::Capitalized => {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Gives names to dependent objects the source left unnamed.
///
/// A name is a tag followed by a qualifier built from the owning table and columns, and a
/// position when the table has more than one candidate. The tag takes the casing of the
/// qualifier, so `Orders` gets `Seq_Orders_Id` and `ORDERS` gets `SEQ_ORDERS_ID`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingStrategy;

impl NamingStrategy {
    pub const DELIMITER: char = '_';
    pub const SEQUENCE_TAG: &'static str = "seq";
    pub const TRIGGER_TAG: &'static str = "trg";
    pub const INDEX_TAG: &'static str = "idx";
    pub const FOREIGN_KEY_TAG: &'static str = "fk";

    /// `position` is 0-based, `candidates` the number of unnamed objects of the same kind
    /// sharing the qualifier.
    pub fn sequence_name(&self, sequence: &Sequence, schema: Option<&Identifier>, position: usize, candidates: usize) -> String {
        if let Some(name) = &sequence.name {
            return name.value().to_string();
        }

        let qualifier = match sequence.owners.first() {
            Some(owner) => vec![owner.table.table.value(), owner.column.value()],
            None => vec![schema.map(|s| s.value()).unwrap_or("")],
        };
        self.render(Self::SEQUENCE_TAG, &qualifier, position, candidates)
    }

    pub fn trigger_name(&self, trigger: &Trigger, position: usize, candidates: usize) -> String {
        if let Some(name) = &trigger.name {
            return name.value().to_string();
        }

        let mut qualifier = vec![trigger.table.table.value()];
        if let Some(column) = &trigger.column {
            qualifier.push(column.value());
        }
        self.render(Self::TRIGGER_TAG, &qualifier, position, candidates)
    }

    pub fn index_name(&self, table: &Table, index: &Index, position: usize, candidates: usize) -> String {
        if let Some(name) = &index.name {
            return name.value().to_string();
        }

        let qualifier = std::iter::once(table.name.value())
            .chain(index.columns.iter().map(|c| c.name.value()))
            .collect_vec();
        self.render(Self::INDEX_TAG, &qualifier, position, candidates)
    }

    pub fn foreign_key_name(&self, foreign_key: &ForeignKey, position: usize, candidates: usize) -> String {
        if let Some(name) = &foreign_key.name {
            return name.value().to_string();
        }

        let qualifier = std::iter::once(foreign_key.foreign_table.table.value())
            .chain(foreign_key.columns.iter().map(|c| c.foreign_column.value()))
            .collect_vec();
        self.render(Self::FOREIGN_KEY_TAG, &qualifier, position, candidates)
    }

    fn render(&self, tag: &str, qualifier: &[&str], position: usize, candidates: usize) -> String {
        let qualifier = qualifier.iter().filter(|p| !p.is_empty()).join(&Self::DELIMITER.to_string());
        let casing = NameCasing::infer(&qualifier);

        let mut name = casing.apply(tag);
        if !qualifier.is_empty() {
            name.push(Self::DELIMITER);
            name.push_str(&qualifier);
        }
        if candidates > 1 {
            name.push(Self::DELIMITER);
            name.push_str(&(position + 1).to_string());
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableRef;

    #[test]
    fn infers_casing() {
        assert_eq!(NameCasing::infer("orders_id"), NameCasing::Lower);
        assert_eq!(NameCasing::infer("Orders_Id"), NameCasing::Capitalized);
        assert_eq!(NameCasing::infer("OrderLines_Id"), NameCasing::Capitalized);
        assert_eq!(NameCasing::infer("ORDERS_ID"), NameCasing::Upper);
        assert_eq!(NameCasing::infer("orders_Id"), NameCasing::Upper);
        assert_eq!(NameCasing::infer("order_2"), NameCasing::Lower);
        assert_eq!(NameCasing::infer("T1_2"), NameCasing::Upper);
    }

    #[test]
    fn names_sequences_after_their_owner() {
        let naming = NamingStrategy;
        let owned = Sequence::default().owned_by(TableRef::in_schema("public", "orders"), "id");
        assert_eq!(naming.sequence_name(&owned, None, 0, 1), "seq_orders_id");

        let upper = Sequence::default().owned_by(TableRef::new("ORDERS"), "ID");
        assert_eq!(naming.sequence_name(&upper, None, 0, 1), "SEQ_ORDERS_ID");

        let capitalized = Sequence::default().owned_by(TableRef::new("Orders"), "Id");
        assert_eq!(naming.sequence_name(&capitalized, None, 0, 1), "Seq_Orders_Id");

        let mixed = Sequence::default().owned_by(TableRef::new("orders"), "Id");
        assert_eq!(naming.sequence_name(&mixed, None, 0, 1), "SEQ_orders_Id");

        let schema = Identifier::new("sales");
        assert_eq!(naming.sequence_name(&Sequence::default(), Some(&schema), 1, 2), "seq_sales_2");
        assert_eq!(naming.sequence_name(&Sequence::new("explicit"), Some(&schema), 0, 1), "explicit");
    }

    #[test]
    fn numbers_triggers_sharing_a_qualifier() {
        let naming = NamingStrategy;
        let trigger = Trigger {
            name: None,
            table: TableRef::new("Orders"),
            trigger_type: Default::default(),
            timing: Default::default(),
            event: Default::default(),
            column: None,
            body: "execute function audit()".to_string(),
        };

        assert_eq!(naming.trigger_name(&trigger, 0, 2), "Trg_Orders_1");
        assert_eq!(naming.trigger_name(&trigger, 1, 2), "Trg_Orders_2");
    }

    #[test]
    fn names_indexes_and_foreign_keys() {
        let naming = NamingStrategy;
        let table = Table::new("orders");
        assert_eq!(naming.index_name(&table, &Index::new(["customer_id", "created_at"]), 0, 1), "idx_orders_customer_id_created_at");

        let fk = ForeignKey::new(TableRef::new("orders"), TableRef::new("customers")).column("customer_id", "id");
        assert_eq!(naming.foreign_key_name(&fk, 0, 1), "fk_orders_customer_id");
    }
}
