//! Row decoding for ClickHouse's default tabular output.
//!
//! Rows are separated by newlines and fields by runs of whitespace. A family's response
//! decodes completely or not at all: the first malformed line fails the whole family.

use crate::collectors::{
    error::DecodeError,
    schema::{Column, ColumnKind},
};

#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Text(String),
    Number(f64),
}

/// One decoded line. Always has exactly as many fields as the schema has columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    fields: Vec<Field>,
}

impl Row {
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Text of a label column, `None` for numeric columns or out of range.
    #[must_use]
    pub fn text(&self, index: usize) -> Option<&str> {
        match self.fields.get(index) {
            Some(Field::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Value of a numeric column, `None` for label columns or out of range.
    #[must_use]
    pub fn number(&self, index: usize) -> Option<f64> {
        match self.fields.get(index) {
            Some(Field::Number(n)) => Some(*n),
            _ => None,
        }
    }
}

/// Parse a numeric field. Accepts integers, decimals and scientific notation.
///
/// # Errors
///
/// Returns the `ParseFloatError` for anything that isn't a number.
pub fn parse_number(value: &str) -> Result<f64, std::num::ParseFloatError> {
    value.trim().parse::<f64>()
}

/// Decode a response body against `columns`.
///
/// # Errors
///
/// Returns [`DecodeError::Arity`] when a non-blank line has a different number of fields
/// than `columns`, [`DecodeError::Number`] when a numeric column doesn't parse and
/// [`DecodeError::Utf8`] when the body isn't text.
pub fn decode(family: &'static str, columns: &[Column], body: &[u8]) -> Result<Vec<Row>, DecodeError> {
    let text = std::str::from_utf8(body).map_err(|_| DecodeError::Utf8 { family })?;

    let mut rows = Vec::new();

    for (i, line) in text.split('\n').enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        if parts.len() != columns.len() {
            return Err(DecodeError::Arity {
                family,
                line: i + 1,
                expected: columns.len(),
                found: parts.len(),
                text: line.to_string(),
            });
        }

        let mut fields = Vec::with_capacity(columns.len());

        for (column, raw) in columns.iter().zip(parts) {
            let raw = raw.trim();

            let field = match column.kind {
                ColumnKind::Label => Field::Text(raw.to_string()),
                ColumnKind::Number => {
                    let value = parse_number(raw).map_err(|_| DecodeError::Number {
                        family,
                        line: i + 1,
                        column: column.name,
                        value: raw.to_string(),
                    })?;
                    Field::Number(value)
                }
            };

            fields.push(field);
        }

        rows.push(Row { fields });
    }

    Ok(rows)
}
