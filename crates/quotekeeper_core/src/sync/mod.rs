//! Remote reconciliation for the quote store.
//!
//! # Responsibility
//! - Fetch candidate quotes from a remote source.
//! - Merge them into the store with remote-wins semantics.
//! - Run reconciliation cycles on demand and on a fixed interval.
//!
//! # Invariants
//! - At most one cycle is in flight per reconciler.
//! - A failed fetch never mutates the store.

pub mod merge;
pub mod reconciler;
pub mod remote;
