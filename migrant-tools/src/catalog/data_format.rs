use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use crate::codec::PortableValue;
use crate::{MigrantToolsError, Result};

const NULL_MARKER: &str = "\\N";

/// Describes how rows are laid out in the data files of a catalog.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataFormat {
    /// One line per row, values separated by the delimiter. Human-readable and easy to
    /// post-process with line based tools.
    Text { delimiter: char },

    /// One JSON array per line.
    Json,
}

impl Default for DataFormat {
    fn default() -> Self {
        DataFormat::Text { delimiter: '\t' }
    }
}

impl DataFormat {
    /// Text format with a custom delimiter. Characters used by escape sequences, line
    /// breaks and the base64 alphabet of binary values are refused.
    pub fn text(delimiter: char) -> Result<Self> {
        let format = DataFormat::Text { delimiter };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> Result {
        match self {
            DataFormat::Text { delimiter } if is_reserved(*delimiter) => Err(MigrantToolsError::InvalidCatalog(format!(
                "`{}` cannot be used as a delimiter",
                delimiter.escape_default()
            ))),
            _ => Ok(()),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DataFormat::Text { .. } => "txt",
            DataFormat::Json => "jsonl",
        }
    }

    /// Appends the header line, newline included.
    pub fn encode_header(&self, names: &[String], out: &mut String) -> Result {
        match self {
            DataFormat::Text { delimiter } => {
                for (idx, name) in names.iter().enumerate() {
                    if idx > 0 {
                        out.push(*delimiter);
                    }
                    escape_text(name, *delimiter, out);
                }
            }
            DataFormat::Json => out.push_str(&serde_json::to_string(names)?),
        }
        out.push('\n');
        Ok(())
    }

    /// Appends one complete row, newline included.
    pub fn encode_row(&self, values: &[PortableValue], out: &mut String) -> Result {
        match self {
            DataFormat::Text { delimiter } => {
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        out.push(*delimiter);
                    }
                    match value {
                        PortableValue::Null => out.push_str(NULL_MARKER),
                        PortableValue::Text(s) => escape_text(s, *delimiter, out),
                        PortableValue::Binary(b) => out.push_str(&STANDARD.encode(b)),
                    }
                }
            }
            DataFormat::Json => {
                let row = values
                    .iter()
                    .map(|v| match v {
                        PortableValue::Null => serde_json::Value::Null,
                        PortableValue::Text(s) => serde_json::Value::String(s.clone()),
                        PortableValue::Binary(b) => serde_json::Value::String(STANDARD.encode(b)),
                    })
                    .collect::<Vec<_>>();
                out.push_str(&serde_json::to_string(&row)?);
            }
        }
        out.push('\n');
        Ok(())
    }

    pub fn decode_header(&self, line: &str) -> Result<Vec<String>> {
        match self {
            DataFormat::Text { delimiter } => Ok(split_text(line, *delimiter)?
                .into_iter()
                .map(|v| match v {
                    PortableValue::Text(s) => s,
                    _ => String::new(),
                })
                .collect()),
            DataFormat::Json => Ok(serde_json::from_str(line)?),
        }
    }

    /// Decodes one row line. Binary values come back as their textual form.
    pub fn decode_row(&self, line: &str, width: usize) -> Result<Vec<PortableValue>> {
        let values = match self {
            DataFormat::Text { delimiter } => split_text(line, *delimiter)?,
            DataFormat::Json => {
                let values: Vec<serde_json::Value> = serde_json::from_str(line)?;
                values
                    .into_iter()
                    .map(|v| match v {
                        serde_json::Value::Null => PortableValue::Null,
                        serde_json::Value::String(s) => PortableValue::Text(s),
                        other => PortableValue::Text(other.to_string()),
                    })
                    .collect()
            }
        };

        if values.len() != width {
            return Err(MigrantToolsError::InvalidCatalog(format!(
                "expected {} values in row, found {}",
                width,
                values.len()
            )));
        }

        Ok(values)
    }
}

fn is_reserved(delimiter: char) -> bool {
    matches!(delimiter, '\\' | '\n' | '\r' | '+' | '/' | '=') || delimiter.is_ascii_alphanumeric()
}

fn escape_text(value: &str, delimiter: char, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

fn split_text(line: &str, delimiter: char) -> Result<Vec<PortableValue>> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut is_null = false;
    let mut chars = line.chars().peekable();

    loop {
        match chars.next() {
            None => {
                values.push(finish_field(&mut current, &mut is_null));
                break;
            }
            Some(c) if c == delimiter => values.push(finish_field(&mut current, &mut is_null)),
            Some('\\') => match chars.next() {
                Some('N') if current.is_empty() && !is_null => is_null = true,
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some('t') => current.push('\t'),
                Some('\\') => current.push('\\'),
                Some(c) if c == delimiter => current.push(c),
                other => {
                    return Err(MigrantToolsError::InvalidCatalog(format!(
                        "invalid escape sequence `\\{}` in `{}`",
                        other.map(String::from).unwrap_or_default(),
                        line
                    )))
                }
            },
            Some(c) => {
                if is_null {
                    return Err(MigrantToolsError::InvalidCatalog(format!("unexpected data after null marker in `{}`", line)));
                }
                current.push(c)
            }
        }
    }

    Ok(values)
}

fn finish_field(current: &mut String, is_null: &mut bool) -> PortableValue {
    if std::mem::take(is_null) {
        PortableValue::Null
    } else {
        PortableValue::Text(std::mem::take(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> PortableValue {
        PortableValue::Text(s.to_string())
    }

    #[test]
    fn refuses_delimiters_that_collide_with_escapes() {
        for delimiter in ['N', 'n', 'r', 't', '\\', '\n', '='] {
            assert!(
                matches!(DataFormat::text(delimiter), Err(MigrantToolsError::InvalidCatalog(_))),
                "{:?} was accepted",
                delimiter
            );
        }
        assert_eq!(DataFormat::text(';').unwrap(), DataFormat::Text { delimiter: ';' });
        assert!(DataFormat::default().validate().is_ok());
    }

    #[test]
    fn text_rows_escape_special_characters() {
        let format = DataFormat::default();
        let mut out = String::new();
        format
            .encode_row(&[text("a\tb"), PortableValue::Null, text("line\nbreak \\N"), text("")], &mut out)
            .unwrap();

        assert_eq!(out, "a\\tb\t\\N\tline\\nbreak \\\\N\t\n");

        let decoded = format.decode_row(out.trim_end_matches('\n'), 4).unwrap();
        assert_eq!(decoded, vec![text("a\tb"), PortableValue::Null, text("line\nbreak \\N"), text("")]);
    }

    #[test]
    fn custom_delimiters_are_escaped() {
        let format = DataFormat::Text { delimiter: ',' };
        let mut out = String::new();
        format.encode_row(&[text("1,5"), text("x")], &mut out).unwrap();

        assert_eq!(out, "1\\,5,x\n");
        assert_eq!(format.decode_row("1\\,5,x", 2).unwrap(), vec![text("1,5"), text("x")]);
    }

    #[test]
    fn binary_values_are_base64() {
        let format = DataFormat::default();
        let mut out = String::new();
        format
            .encode_row(&[PortableValue::Binary(bytes::Bytes::from_static(b"hi\n"))], &mut out)
            .unwrap();

        assert_eq!(out, "aGkK\n");
    }

    #[test]
    fn json_rows() {
        let format = DataFormat::Json;
        let mut out = String::new();
        format.encode_header(&["id".to_string(), "name".to_string()], &mut out).unwrap();
        format.encode_row(&[text("1"), PortableValue::Null], &mut out).unwrap();

        assert_eq!(out, "[\"id\",\"name\"]\n[\"1\",null]\n");

        let mut lines = out.lines();
        assert_eq!(format.decode_header(lines.next().unwrap()).unwrap(), vec!["id", "name"]);
        assert_eq!(format.decode_row(lines.next().unwrap(), 2).unwrap(), vec![text("1"), PortableValue::Null]);
    }

    #[test]
    fn rejects_rows_of_wrong_width() {
        let format = DataFormat::default();
        assert!(matches!(format.decode_row("1\t2", 3), Err(MigrantToolsError::InvalidCatalog(_))));
    }
}
