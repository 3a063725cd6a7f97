//! Domain model for stored quotes.
//!
//! # Responsibility
//! - Define the `Quote` record shared by the store, selector and reconciler.
//! - Provide one schema-validating decode path for untrusted JSON.
//!
//! # Invariants
//! - A `Quote` is immutable once created; the store only appends or replaces.
//! - Every `Quote` reachable from the store has non-blank `text` and `category`.

pub mod decode;
pub mod quote;
