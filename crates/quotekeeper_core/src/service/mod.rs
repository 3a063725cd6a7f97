//! Quote use-case services.
//!
//! # Responsibility
//! - Orchestrate key-value repositories into store-level operations.
//! - Keep CLI callers decoupled from storage and JSON details.

pub mod quote_store;
pub mod selector;
