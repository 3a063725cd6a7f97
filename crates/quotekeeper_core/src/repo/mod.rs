//! Key-value persistence behind the quote store.
//!
//! # Responsibility
//! - Define the storage contract the store writes its records through.
//! - Isolate SQLite details from store orchestration.
//!
//! # Invariants
//! - Values are opaque strings; JSON encoding is the caller's concern.
//! - `set` overwrites the whole value for a key; there are no partial writes.

pub mod kv_repo;
