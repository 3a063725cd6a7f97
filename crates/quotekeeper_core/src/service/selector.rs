//! Category filter and random selection over a quote snapshot.
//!
//! # Invariants
//! - Category matching is case-sensitive and exact.
//! - `CategoryFilter::All` is persisted as the sentinel string `all`.

use crate::model::quote::Quote;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Sentinel stored for "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Active category filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// Parses a stored or user-provided filter value.
    ///
    /// Blank input and the `all` sentinel both mean no filter. Any other
    /// value is kept verbatim, since stored categories are not trimmed.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Category(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Category(category) => category.as_str(),
        }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => quote.category == *category,
        }
    }
}

impl Display for CategoryFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the distinct categories in alphabetical order.
pub fn categories(quotes: &[Quote]) -> BTreeSet<String> {
    quotes.iter().map(|quote| quote.category.clone()).collect()
}

/// Picks one quote matching `filter` uniformly at random.
///
/// Returns `None` when no quote matches.
pub fn pick<'a, R: Rng + ?Sized>(
    quotes: &'a [Quote],
    filter: &CategoryFilter,
    rng: &mut R,
) -> Option<&'a Quote> {
    let candidates: Vec<&Quote> = quotes.iter().filter(|quote| filter.matches(quote)).collect();
    candidates.choose(rng).copied()
}
