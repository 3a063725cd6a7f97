//! Quote domain model.
//!
//! # Responsibility
//! - Define the canonical `(text, category)` record with optional author.
//! - Validate user input before it reaches persistence.
//!
//! # Invariants
//! - `text` and `category` are non-empty after trimming.
//! - `author` is omitted from JSON when absent.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A single quotable record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// The quotable content.
    pub text: String,
    /// Free-form label used for filtering.
    pub category: String,
    /// Optional attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Validation failure for quote input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteValidationError {
    EmptyText,
    EmptyCategory,
}

impl Display for QuoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "quote text cannot be empty"),
            Self::EmptyCategory => write!(f, "quote category cannot be empty"),
        }
    }
}

impl Error for QuoteValidationError {}

impl Quote {
    /// Creates a quote from raw user input.
    ///
    /// Both fields are trimmed; blank input is rejected.
    pub fn new(
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> Result<Self, QuoteValidationError> {
        let quote = Self {
            text: text.as_ref().trim().to_string(),
            category: category.as_ref().trim().to_string(),
            author: None,
        };
        quote.validate()?;
        Ok(quote)
    }

    /// Checks required-field invariants.
    ///
    /// Text is checked before category, so a quote with both fields blank
    /// reports `EmptyText`.
    pub fn validate(&self) -> Result<(), QuoteValidationError> {
        if self.text.trim().is_empty() {
            return Err(QuoteValidationError::EmptyText);
        }
        if self.category.trim().is_empty() {
            return Err(QuoteValidationError::EmptyCategory);
        }
        Ok(())
    }

    /// Returns whether `other` has the exact same `(text, category)` pair.
    pub fn same_entry(&self, other: &Self) -> bool {
        self.text == other.text && self.category == other.category
    }

    /// Case-folded text used by the reconciler as its deduplication key.
    pub fn dedup_key(&self) -> String {
        self.text.to_lowercase()
    }
}

/// Seed set used when durable storage holds no usable record.
pub fn default_quotes() -> Vec<Quote> {
    [
        ("Success is not final; failure is not fatal.", "Motivation"),
        ("In the middle of difficulty lies opportunity.", "Inspiration"),
        (
            "Life is what happens when you're busy making other plans.",
            "Life",
        ),
    ]
    .into_iter()
    .map(|(text, category)| Quote {
        text: text.to_string(),
        category: category.to_string(),
        author: None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::{default_quotes, Quote, QuoteValidationError};

    #[test]
    fn new_trims_fields() {
        let quote = Quote::new("  Stay hungry.  ", " Life ").unwrap();
        assert_eq!(quote.text, "Stay hungry.");
        assert_eq!(quote.category, "Life");
        assert_eq!(quote.author, None);
    }

    #[test]
    fn new_rejects_blank_fields() {
        assert_eq!(
            Quote::new("   ", "Life").unwrap_err(),
            QuoteValidationError::EmptyText
        );
        assert_eq!(
            Quote::new("Text", "\t").unwrap_err(),
            QuoteValidationError::EmptyCategory
        );
    }

    #[test]
    fn author_is_skipped_in_json_when_absent() {
        let quote = Quote::new("A", "B").unwrap();
        assert_eq!(
            serde_json::to_string(&quote).unwrap(),
            r#"{"text":"A","category":"B"}"#
        );

        let with_author = Quote {
            author: Some("Someone".to_string()),
            ..quote
        };
        assert_eq!(
            serde_json::to_string(&with_author).unwrap(),
            r#"{"text":"A","category":"B","author":"Someone"}"#
        );
    }

    #[test]
    fn dedup_key_is_case_insensitive_but_same_entry_is_exact() {
        let upper = Quote::new("Hello", "X").unwrap();
        let lower = Quote::new("hello", "X").unwrap();
        assert_eq!(upper.dedup_key(), lower.dedup_key());
        assert!(!upper.same_entry(&lower));
    }

    #[test]
    fn default_seed_set_is_valid_and_ordered() {
        let seeds = default_quotes();
        assert_eq!(seeds.len(), 3);
        assert!(seeds.iter().all(|quote| quote.validate().is_ok()));
        assert_eq!(seeds[0].category, "Motivation");
        assert_eq!(seeds[2].category, "Life");
    }
}
