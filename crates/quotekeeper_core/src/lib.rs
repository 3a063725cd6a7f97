//! Core domain logic for QuoteKeeper.
//! This crate is the single source of truth for quote store invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{ConfigError, QuoteKeeperConfig};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::decode::{decode_quote, PayloadError, QuoteDecodeError};
pub use model::quote::{default_quotes, Quote, QuoteValidationError};
pub use repo::kv_repo::{
    KvRepository, MemoryKvRepository, RepoError, RepoResult, SqliteKvRepository,
};
pub use service::quote_store::{
    load_quotes, AddOutcome, ExportBlob, ImportError, ImportReport, LoadOutcome, PersistStatus,
    QuoteStore, SeedReason, LAST_FILTER_KEY, LAST_VIEWED_KEY, QUOTES_KEY,
};
pub use service::selector::{categories, pick, CategoryFilter, ALL_CATEGORIES};
pub use sync::merge::{merge, MergeSummary};
pub use sync::reconciler::{CycleOutcome, CycleReport, CycleState, Reconciler};
pub use sync::remote::{
    project_remote_items, HttpQuoteSource, RemoteError, RemoteQuoteSource, SERVER_CATEGORY,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
