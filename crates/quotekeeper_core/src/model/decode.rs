//! Schema-validating decode for untrusted quote JSON.
//!
//! # Responsibility
//! - Turn raw JSON text into typed `Quote` values or structured errors.
//! - Serve durable load, file import and remote payloads through one path.
//!
//! # Invariants
//! - A decoded `Quote` always passes `Quote::validate()`.
//! - Decoding never trims or rewrites accepted field values.

use crate::model::quote::{Quote, QuoteValidationError};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure to decode one JSON value as a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteDecodeError {
    NotAnObject,
    MissingField(&'static str),
    NotAString(&'static str),
    Invalid(QuoteValidationError),
}

impl Display for QuoteDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "quote entry is not a JSON object"),
            Self::MissingField(field) => write!(f, "quote entry is missing `{field}`"),
            Self::NotAString(field) => write!(f, "quote field `{field}` must be a string"),
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QuoteDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QuoteValidationError> for QuoteDecodeError {
    fn from(value: QuoteValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Failure to decode a whole JSON payload.
#[derive(Debug)]
pub enum PayloadError {
    /// Text is not JSON at all.
    Malformed(serde_json::Error),
    /// Top-level value is not an array.
    NotAnArray,
    /// Element at `index` is not a valid quote (strict decode only).
    InvalidEntry {
        index: usize,
        source: QuoteDecodeError,
    },
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "invalid JSON: {err}"),
            Self::NotAnArray => write!(f, "expected a JSON array of quotes"),
            Self::InvalidEntry { index, source } => write!(f, "entry {index}: {source}"),
        }
    }
}

impl Error for PayloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::NotAnArray => None,
            Self::InvalidEntry { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value)
    }
}

/// Decodes one JSON value as a quote.
///
/// `text` and `category` must be non-blank strings. An `author` that is not
/// a string is treated as absent.
pub fn decode_quote(value: &Value) -> Result<Quote, QuoteDecodeError> {
    let object = value.as_object().ok_or(QuoteDecodeError::NotAnObject)?;

    let quote = Quote {
        text: required_string(object, "text")?,
        category: required_string(object, "category")?,
        author: optional_string(object, "author"),
    };
    quote.validate()?;
    Ok(quote)
}

/// Parses raw text and returns the elements of its top-level array.
pub fn parse_array(raw: &str) -> Result<Vec<Value>, PayloadError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => Ok(items),
        _ => Err(PayloadError::NotAnArray),
    }
}

/// Decodes an array payload, failing on the first invalid element.
pub fn decode_quotes_strict(raw: &str) -> Result<Vec<Quote>, PayloadError> {
    parse_array(raw)?
        .iter()
        .enumerate()
        .map(|(index, value)| {
            decode_quote(value).map_err(|source| PayloadError::InvalidEntry { index, source })
        })
        .collect()
}

/// Decodes an array payload, keeping valid elements and counting the rest.
///
/// Returns `(quotes, invalid_count)`.
pub fn decode_quotes_lenient(raw: &str) -> Result<(Vec<Quote>, usize), PayloadError> {
    let items = parse_array(raw)?;
    let mut quotes = Vec::with_capacity(items.len());
    let mut invalid = 0;
    for value in &items {
        match decode_quote(value) {
            Ok(quote) => quotes.push(quote),
            Err(_) => invalid += 1,
        }
    }
    Ok((quotes, invalid))
}

fn required_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, QuoteDecodeError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(QuoteDecodeError::MissingField(field)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(QuoteDecodeError::NotAString(field)),
    }
}

fn optional_string(object: &Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{
        decode_quote, decode_quotes_lenient, decode_quotes_strict, PayloadError,
        QuoteDecodeError,
    };
    use crate::model::quote::QuoteValidationError;
    use serde_json::json;

    #[test]
    fn decodes_optional_author() {
        let quote = decode_quote(&json!({"text": "A", "category": "C", "author": "Z"})).unwrap();
        assert_eq!(quote.author.as_deref(), Some("Z"));

        let quote = decode_quote(&json!({"text": "A", "category": "C", "author": null})).unwrap();
        assert_eq!(quote.author, None);
    }

    #[test]
    fn non_string_author_is_dropped() {
        let quote = decode_quote(&json!({"text": "A", "category": "C", "author": 1})).unwrap();
        assert_eq!(quote.author, None);
        assert_eq!(quote.text, "A");
    }

    #[test]
    fn rejects_missing_or_mistyped_fields() {
        assert_eq!(
            decode_quote(&json!({"category": "C"})).unwrap_err(),
            QuoteDecodeError::MissingField("text")
        );
        assert_eq!(
            decode_quote(&json!({"text": "A", "category": 7})).unwrap_err(),
            QuoteDecodeError::NotAString("category")
        );
        assert_eq!(
            decode_quote(&json!("just text")).unwrap_err(),
            QuoteDecodeError::NotAnObject
        );
    }

    #[test]
    fn rejects_blank_required_fields() {
        assert_eq!(
            decode_quote(&json!({"text": "  ", "category": "C"})).unwrap_err(),
            QuoteDecodeError::Invalid(QuoteValidationError::EmptyText)
        );
    }

    #[test]
    fn strict_decode_reports_first_invalid_index() {
        let raw = r#"[{"text":"A","category":"C"},{"text":"B"}]"#;
        match decode_quotes_strict(raw).unwrap_err() {
            PayloadError::InvalidEntry { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source, QuoteDecodeError::MissingField("category"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn payload_must_be_a_json_array() {
        assert!(matches!(
            decode_quotes_strict(r#"{"text":"A"}"#),
            Err(PayloadError::NotAnArray)
        ));
        assert!(matches!(
            decode_quotes_lenient("not json"),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn lenient_decode_counts_invalid_entries() {
        let raw = r#"[{"text":"A","category":"C"}, 3, {"text":"B","category":""}]"#;
        let (quotes, invalid) = decode_quotes_lenient(raw).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(invalid, 2);
    }
}
