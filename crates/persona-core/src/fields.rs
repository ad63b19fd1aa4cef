//! Presence validation of JSON body fields
//!
//! A field is present when its key exists with a truthy value: not `null`,
//! not `""`, not `0`, not `false`. Present values are then read into the
//! type the column needs.

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Why a field could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Missing(&'static str),
    Invalid {
        field: &'static str,
        expected: &'static str,
    },
}

impl FieldError {
    /// Client message; `missing` is the operation's own wording
    pub fn message(&self, missing: &str) -> String {
        match self {
            FieldError::Missing(_) => missing.to_string(),
            FieldError::Invalid { field, expected } => {
                format!("El campo {} debe ser {}", field, expected)
            }
        }
    }
}

pub type FieldResult<T> = Result<T, FieldError>;

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read-only view over a parsed request body
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// Presence check over a whole field set, reporting the first missing one.
    /// Runs before any typed read so a missing field wins over a malformed one.
    pub fn require(&self, names: &[&'static str]) -> FieldResult<()> {
        match names.iter().copied().find(|&name| self.present(name).is_err()) {
            Some(name) => Err(FieldError::Missing(name)),
            None => Ok(()),
        }
    }

    fn present(&self, name: &'static str) -> FieldResult<&'a Value> {
        self.map
            .get(name)
            .filter(|v| is_truthy(v))
            .ok_or(FieldError::Missing(name))
    }

    /// Text column; JSON numbers are accepted and rendered in decimal
    pub fn text(&self, name: &'static str) -> FieldResult<String> {
        match self.present(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(FieldError::Invalid {
                field: name,
                expected: "texto",
            }),
        }
    }

    /// Integer column; a string holding an integer is accepted
    pub fn integer(&self, name: &'static str) -> FieldResult<i64> {
        let invalid = FieldError::Invalid {
            field: name,
            expected: "un número entero",
        };
        match self.present(name)? {
            Value::Number(n) => n.as_i64().ok_or(invalid),
            Value::String(s) => s.trim().parse().map_err(|_| invalid),
            _ => Err(invalid),
        }
    }

    /// Date column: `YYYY-MM-DD`, optionally followed by a time part
    pub fn date(&self, name: &'static str) -> FieldResult<NaiveDate> {
        let invalid = FieldError::Invalid {
            field: name,
            expected: "una fecha AAAA-MM-DD",
        };
        match self.present(name)? {
            Value::String(s) => parse_date(s).ok_or(invalid),
            _ => Err(invalid),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = match raw.char_indices().nth(10) {
        Some((idx, 'T')) | Some((idx, ' ')) => &raw[..idx],
        Some(_) => return None,
        None => raw,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
