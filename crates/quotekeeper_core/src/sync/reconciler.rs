//! Serialized fetch-and-merge cycles against a remote quote source.
//!
//! # Responsibility
//! - Drive one cycle: `Idle -> Fetching -> {MergeApplied | FetchFailed} -> Idle`.
//! - Schedule cycles on a fixed interval until cancelled.
//!
//! # Invariants
//! - Cycles never overlap. Scheduled ticks skip while a cycle is in flight;
//!   on-demand cycles wait for it and then run.
//! - The fetch runs outside the store lock; the merge runs as one atomic
//!   store update, so concurrent user writes are merged, never lost.
//! - A cycle is never cancelled mid-flight and is never retried; the next
//!   tick is the retry.

use crate::model::quote::Quote;
use crate::service::quote_store::{PersistStatus, QuoteStore};
use crate::sync::merge::{merge_with_summary, MergeSummary};
use crate::sync::remote::{RemoteError, RemoteQuoteSource};
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Default cadence of scheduled cycles.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);
/// Default bound on one remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable reconciler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
}

/// Terminal result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    MergeApplied {
        summary: MergeSummary,
        persist: PersistStatus,
    },
    FetchFailed(String),
    /// A scheduled tick found another cycle in flight.
    Skipped,
}

/// Report returned for every cycle attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    /// One-line summary for user display.
    pub fn summary(&self) -> String {
        match &self.outcome {
            CycleOutcome::MergeApplied { summary, persist } => {
                let mut message = format!(
                    "Synced {} remote quote(s); {} local quote(s) kept, {} replaced by server copies",
                    summary.remote, summary.kept_local, summary.dropped_local
                );
                if let Some(reason) = persist.failure() {
                    message.push_str(&format!(" (not saved: {reason})"));
                }
                message
            }
            CycleOutcome::FetchFailed(reason) => format!("Sync failed: {reason}"),
            CycleOutcome::Skipped => "Sync skipped: another sync is in progress".to_string(),
        }
    }
}

/// Reconciles a quote store against one remote source.
pub struct Reconciler {
    store: QuoteStore,
    source: Arc<dyn RemoteQuoteSource>,
    fetch_timeout: Duration,
    cycle_lock: tokio::sync::Mutex<()>,
    state: Mutex<CycleState>,
}

impl Reconciler {
    pub fn new(
        store: QuoteStore,
        source: Arc<dyn RemoteQuoteSource>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            source,
            fetch_timeout,
            cycle_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(CycleState::Idle),
        }
    }

    pub fn state(&self) -> CycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self) -> &QuoteStore {
        &self.store
    }

    /// Fetches one remote batch, bounded by the configured timeout.
    pub async fn fetch_remote(&self) -> Result<Vec<Quote>, RemoteError> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.fetch_timeout)),
        }
    }

    /// Runs a cycle now, waiting for any in-flight cycle to finish first.
    pub async fn sync_now(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;
        self.run_cycle("manual").await
    }

    /// Runs a scheduled cycle unless one is already in flight.
    pub async fn tick(&self) -> CycleReport {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            let cycle_id = Uuid::new_v4();
            info!(
                "event=sync_cycle module=sync status=skipped trigger=schedule cycle_id={cycle_id}"
            );
            return CycleReport {
                cycle_id,
                outcome: CycleOutcome::Skipped,
            };
        };
        self.run_cycle("schedule").await
    }

    /// Spawns the periodic scheduler.
    ///
    /// The first cycle runs one `interval` after spawning. Cancelling `cancel`
    /// stops the loop after any in-flight cycle completes.
    pub fn spawn_periodic(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await; // skip immediate tick
            info!(
                "event=sync_schedule module=sync status=start interval_ms={}",
                interval.as_millis()
            );
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        reconciler.tick().await;
                    }
                }
            }
            info!("event=sync_schedule module=sync status=stopped");
        })
    }

    async fn run_cycle(&self, trigger: &'static str) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let started_at = Instant::now();
        self.set_state(CycleState::Fetching);
        info!(
            "event=sync_cycle module=sync status=start trigger={trigger} source={} cycle_id={cycle_id}",
            self.source.source_id()
        );

        let outcome = match self.fetch_remote().await {
            Ok(remote) => {
                let (summary, persist) = self.store.update(|local| {
                    let (merged, summary) = merge_with_summary(&remote, local);
                    *local = merged;
                    summary
                });
                info!(
                    "event=sync_cycle module=sync status=ok trigger={trigger} cycle_id={cycle_id} duration_ms={} remote={} kept_local={} dropped_local={} saved={}",
                    started_at.elapsed().as_millis(),
                    summary.remote,
                    summary.kept_local,
                    summary.dropped_local,
                    persist.is_saved()
                );
                CycleOutcome::MergeApplied { summary, persist }
            }
            Err(err) => {
                warn!(
                    "event=sync_cycle module=sync status=error trigger={trigger} cycle_id={cycle_id} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                CycleOutcome::FetchFailed(err.to_string())
            }
        };

        self.set_state(CycleState::Idle);
        CycleReport { cycle_id, outcome }
    }

    fn set_state(&self, next: CycleState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
