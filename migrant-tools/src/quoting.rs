use std::collections::HashMap;

/// Case an engine folds unquoted identifiers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IdentifierCase {
    Lower,
    Upper,
    /// Unquoted identifiers keep their case.
    Mixed,
}

/// Provides utilities for quoting identifiers as needed by one engine.
#[derive(Debug, Clone)]
pub struct IdentifierQuoter {
    open_quote: char,
    close_quote: char,
    unquoted_case: IdentifierCase,
    /// Keywords that might need to be escaped, and whether they are allowed to be used as column names or type/function names.
    keywords: HashMap<String, AllowedKeywordUsage>,
}

/// How a keyword is allowed to be used.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AllowedKeywordUsage {
    pub column_name: bool,
    pub type_or_function_name: bool,
}

impl AllowedKeywordUsage {
    pub const RESERVED: AllowedKeywordUsage = AllowedKeywordUsage {
        column_name: false,
        type_or_function_name: false,
    };
}

/// How an identifier is attempted to be used.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AttemptedKeywordUsage {
    ColumnName,
    TypeOrFunctionName,
    Other,
}

impl IdentifierQuoter {
    /// Creates a new IdentifierQuoter with the specified keywords and their allowed usages.
    pub fn new(open_quote: char, close_quote: char, unquoted_case: IdentifierCase, keywords: HashMap<String, AllowedKeywordUsage>) -> Self {
        Self {
            open_quote,
            close_quote,
            unquoted_case,
            keywords,
        }
    }

    /// Creates a new IdentifierQuoter using ANSI double quotes, lower case folding and no keywords.
    ///
    /// This is mainly useful for testing as it doesn't require connecting to a database.
    pub fn empty() -> Self {
        Self::new('"', '"', IdentifierCase::Lower, HashMap::new())
    }

    /// Marks every word as a reserved keyword.
    pub fn with_reserved_words<'a>(mut self, words: impl IntoIterator<Item = &'a str>) -> Self {
        for word in words {
            self.keywords.insert(word.to_lowercase(), AllowedKeywordUsage::RESERVED);
        }
        self
    }

    pub fn set_keywords(&mut self, keywords: HashMap<String, AllowedKeywordUsage>) {
        self.keywords = keywords;
    }

    pub fn unquoted_case(&self) -> IdentifierCase {
        self.unquoted_case
    }

    /// Quotes an identifier as needed.
    ///
    /// An identifier is left alone when it only uses characters the engine accepts
    /// unquoted, is already in the engine's folding case, and is not a keyword reserved
    /// for the attempted usage.
    pub fn quote(&self, identifier: impl AsRef<str>, usage: AttemptedKeywordUsage) -> String {
        let identifier = identifier.as_ref();

        if identifier.is_empty() {
            return format!("{}{}", self.open_quote, self.close_quote);
        }

        let safe = if let Some(allowed) = self.keywords.get(&identifier.to_lowercase()) {
            match usage {
                AttemptedKeywordUsage::ColumnName => allowed.column_name,
                AttemptedKeywordUsage::TypeOrFunctionName => allowed.type_or_function_name,
                AttemptedKeywordUsage::Other => false,
            }
        } else {
            self.is_plain_identifier(identifier)
        };

        if safe {
            identifier.to_string()
        } else {
            let doubled: String = [self.close_quote, self.close_quote].iter().collect();
            let escaped = identifier.replace(self.close_quote, &doubled);

            format!("{}{escaped}{}", self.open_quote, self.close_quote)
        }
    }

    fn is_plain_identifier(&self, identifier: &str) -> bool {
        let case_ok = |c: char| match self.unquoted_case {
            IdentifierCase::Lower => !c.is_ascii_uppercase(),
            IdentifierCase::Upper => !c.is_ascii_lowercase(),
            IdentifierCase::Mixed => true,
        };

        let mut chars = identifier.chars();
        matches!(chars.next(), Some(c) if (c.is_ascii_alphabetic() || c == '_') && case_ok(c))
            && chars.all(|c| (c.is_ascii_alphanumeric() || c == '_') && case_ok(c))
    }
}

/// Quotes a string value as a SQL literal.
pub(crate) fn quote_value_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        let quoter = IdentifierQuoter::empty().with_reserved_words(["table"]);

        macro_rules! test_quote {
            ($identifier:literal, $expected:literal) => {
                let quoted = quoter.quote($identifier, AttemptedKeywordUsage::Other);
                assert_eq!(quoted, $expected);
            };
        }

        test_quote!("table", "\"table\"");
        test_quote!("TABLE", "\"TABLE\"");
        test_quote!("table1", "table1");
        test_quote!("table_1", "table_1");
        test_quote!("table-1", "\"table-1\"");
        test_quote!("table 1", "\"table 1\"");
        test_quote!("1table", "\"1table\"");
        test_quote!("MyTable", "\"MyTable\"");
        test_quote!("my\"table", "\"my\"\"table\"");
        test_quote!("", "\"\"");
    }

    #[test]
    fn keyword_usage_is_respected() {
        let quoter = IdentifierQuoter::new('"', '"', IdentifierCase::Lower, HashMap::from([(
            "name".to_string(),
            AllowedKeywordUsage {
                column_name: true,
                type_or_function_name: false,
            },
        )]));

        assert_eq!(quoter.quote("name", AttemptedKeywordUsage::ColumnName), "name");
        assert_eq!(quoter.quote("name", AttemptedKeywordUsage::TypeOrFunctionName), "\"name\"");
    }

    #[test]
    fn backticks_and_mixed_case() {
        let quoter = IdentifierQuoter::new('`', '`', IdentifierCase::Mixed, HashMap::new())
            .with_reserved_words(["order"]);

        assert_eq!(quoter.quote("MyTable", AttemptedKeywordUsage::Other), "MyTable");
        assert_eq!(quoter.quote("Order", AttemptedKeywordUsage::Other), "`Order`");
        assert_eq!(quoter.quote("odd`name", AttemptedKeywordUsage::Other), "`odd``name`");
    }

    #[test]
    fn upper_case_folding() {
        let quoter = IdentifierQuoter::new('"', '"', IdentifierCase::Upper, HashMap::new());

        assert_eq!(quoter.quote("CUSTOMERS", AttemptedKeywordUsage::Other), "CUSTOMERS");
        assert_eq!(quoter.quote("customers", AttemptedKeywordUsage::Other), "\"customers\"");
    }
}
