//! Remote-wins merge of a remote batch into local quotes.
//!
//! # Invariants
//! - The remote batch is kept verbatim and in received order, including any
//!   duplicates inside the batch itself.
//! - A local quote survives only if its lowercased `text` matches no remote
//!   `text`; survivors keep their relative order after the remote batch.
//! - The merge is not symmetric: swapping arguments changes which copy of
//!   a shared text survives.

use crate::model::quote::Quote;
use std::collections::HashSet;

/// Counts describing one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub remote: usize,
    pub kept_local: usize,
    pub dropped_local: usize,
}

impl MergeSummary {
    pub fn total(&self) -> usize {
        self.remote + self.kept_local
    }
}

/// Merges `remote` over `local`.
pub fn merge(remote: &[Quote], local: &[Quote]) -> Vec<Quote> {
    merge_with_summary(remote, local).0
}

pub fn merge_with_summary(remote: &[Quote], local: &[Quote]) -> (Vec<Quote>, MergeSummary) {
    let remote_keys: HashSet<String> = remote.iter().map(Quote::dedup_key).collect();

    let mut merged = remote.to_vec();
    merged.extend(
        local
            .iter()
            .filter(|quote| !remote_keys.contains(&quote.dedup_key()))
            .cloned(),
    );

    let kept_local = merged.len() - remote.len();
    let summary = MergeSummary {
        remote: remote.len(),
        kept_local,
        dropped_local: local.len() - kept_local,
    };
    (merged, summary)
}
