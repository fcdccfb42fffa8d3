use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};

/// A name of a database object.
///
/// Keeps the name exactly as it was read from the source, together with a normalized
/// form used for comparisons. Two identifiers are equal when their normalized forms are,
/// so `Users` and `users` refer to the same object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identifier {
    value: String,
    normalized: String,
}

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let normalized = value.to_lowercase();
        Identifier { value, normalized }
    }

    /// The name in its original case.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn matches(&self, name: &str) -> bool {
        self.normalized == name.to_lowercase()
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_case_insensitively_but_keeps_original_case() {
        let upper = Identifier::new("Users");
        let lower = Identifier::new("users");

        assert_eq!(upper, lower);
        assert_eq!(upper.value(), "Users");
        assert_eq!(upper.normalized(), "users");
        assert!(upper.matches("USERS"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Identifier::new("Orders")).unwrap();
        assert_eq!(json, "\"Orders\"");

        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), "Orders");
    }
}
