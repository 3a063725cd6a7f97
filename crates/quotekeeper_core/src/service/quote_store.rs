//! Quote store use-case service.
//!
//! # Responsibility
//! - Own the in-memory quote sequence together with its durable and session
//!   repositories.
//! - Provide load/save/add/import/export and the remembered filter.
//!
//! # Invariants
//! - Every mutation runs "read, compute, persist" under one lock, so
//!   concurrent writers never drop each other's changes.
//! - Durable write failures never roll back memory; memory stays
//!   authoritative for the rest of the session.
//! - Loading never fails; unusable durable data is replaced by the seed set.
//! - A record that could not be read is never overwritten by loading.

use crate::model::decode::{
    decode_quote, decode_quotes_lenient, decode_quotes_strict, PayloadError,
};
use crate::model::quote::{default_quotes, Quote, QuoteValidationError};
use crate::repo::kv_repo::KvRepository;
use crate::service::selector::{pick, CategoryFilter};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::Rng;
use std::error::Error;
use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Durable key holding the JSON quote array.
pub const QUOTES_KEY: &str = "quotes";
/// Durable key holding the last selected category.
pub const LAST_FILTER_KEY: &str = "lastSelectedCategory";
/// Session key holding the last shown quote.
pub const LAST_VIEWED_KEY: &str = "lastViewedQuote";

/// Result of writing the quote array to durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    Saved,
    /// User-visible reason; the in-memory change is kept.
    Failed(String),
}

impl PersistStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Saved => None,
            Self::Failed(message) => Some(message.as_str()),
        }
    }
}

/// Why the seed set replaced the durable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedReason {
    Missing,
    /// Storage read failed; seeds are held in memory and not written.
    Unreadable(String),
    Invalid(String),
}

/// How the store contents were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored { count: usize },
    Seeded {
        reason: SeedReason,
        persist: PersistStatus,
    },
}

/// Result of a successful `add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub quote: Quote,
    pub persist: PersistStatus,
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Valid entries appended to the store.
    pub added: usize,
    /// Valid entries skipped because the `(text, category)` pair existed.
    pub duplicates: usize,
    /// Entries that failed quote decoding.
    pub invalid: usize,
    /// `None` when nothing was added and no write happened.
    pub persist: Option<PersistStatus>,
}

impl ImportReport {
    /// One-line summary for user display.
    pub fn summary(&self) -> String {
        let mut message = format!(
            "Imported {} new quote(s); {} duplicate(s) skipped",
            self.added, self.duplicates
        );
        if self.invalid > 0 {
            message.push_str(&format!("; {} invalid entr(ies) ignored", self.invalid));
        }
        if let Some(PersistStatus::Failed(reason)) = &self.persist {
            message.push_str(&format!(" (not saved: {reason})"));
        }
        message
    }
}

/// Import rejection; the store is unchanged.
#[derive(Debug)]
pub enum ImportError {
    UnsupportedFile(PathBuf),
    Io(std::io::Error),
    Payload(PayloadError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFile(path) => {
                write!(f, "import file must have a .json extension: {}", path.display())
            }
            Self::Io(err) => write!(f, "failed to read import file: {err}"),
            Self::Payload(err) => write!(f, "invalid import file: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnsupportedFile(_) => None,
            Self::Io(err) => Some(err),
            Self::Payload(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PayloadError> for ImportError {
    fn from(value: PayloadError) -> Self {
        Self::Payload(value)
    }
}

/// Export payload and suggested file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Reads the durable quote record, seeding it when unusable.
///
/// Never fails. A missing record, malformed JSON, a non-array value or an
/// element without string `text`/`category` all yield the seed set, which
/// is written back immediately. A failed read also yields the seed set but
/// leaves storage untouched, since the record may still be intact.
pub fn load_quotes(durable: &dyn KvRepository) -> (Vec<Quote>, LoadOutcome) {
    let reason = match durable.get(QUOTES_KEY) {
        Ok(None) => SeedReason::Missing,
        Ok(Some(raw)) => match decode_quotes_strict(&raw) {
            Ok(quotes) => {
                let count = quotes.len();
                info!("event=store_load module=store status=ok source=durable count={count}");
                return (quotes, LoadOutcome::Restored { count });
            }
            Err(err) => SeedReason::Invalid(err.to_string()),
        },
        Err(err) => SeedReason::Unreadable(err.to_string()),
    };

    let seeds = default_quotes();
    let persist = match &reason {
        SeedReason::Unreadable(err) => {
            PersistStatus::Failed(format!("saved quotes could not be read: {err}"))
        }
        SeedReason::Missing | SeedReason::Invalid(_) => persist_quotes(durable, &seeds),
    };
    match &reason {
        SeedReason::Missing => info!(
            "event=store_load module=store status=ok source=seed reason=missing count={}",
            seeds.len()
        ),
        SeedReason::Unreadable(err) | SeedReason::Invalid(err) => warn!(
            "event=store_load module=store status=fallback source=seed count={} error={}",
            seeds.len(),
            err
        ),
    }
    (seeds, LoadOutcome::Seeded { reason, persist })
}

fn persist_quotes(durable: &dyn KvRepository, quotes: &[Quote]) -> PersistStatus {
    let encoded = match serde_json::to_string(quotes) {
        Ok(encoded) => encoded,
        Err(err) => return PersistStatus::Failed(format!("could not encode quotes: {err}")),
    };
    match durable.set(QUOTES_KEY, &encoded) {
        Ok(()) => PersistStatus::Saved,
        Err(err) => {
            warn!(
                "event=store_save module=store status=error count={} error={}",
                quotes.len(),
                err
            );
            PersistStatus::Failed(format!("quotes could not be saved: {err}"))
        }
    }
}

struct StoreState {
    quotes: Vec<Quote>,
    durable: Box<dyn KvRepository>,
}

impl StoreState {
    fn persist(&self) -> PersistStatus {
        persist_quotes(self.durable.as_ref(), &self.quotes)
    }
}

struct StoreInner {
    state: Mutex<StoreState>,
    session: Mutex<Box<dyn KvRepository>>,
    load_outcome: LoadOutcome,
}

/// Shared handle to the quote store.
///
/// Clones refer to the same store; hand one to the reconciler and keep
/// another for user-initiated operations.
#[derive(Clone)]
pub struct QuoteStore {
    inner: Arc<StoreInner>,
}

impl QuoteStore {
    /// Loads the store from `durable` and attaches `session` storage.
    pub fn open(
        durable: impl KvRepository + 'static,
        session: impl KvRepository + 'static,
    ) -> Self {
        let (quotes, load_outcome) = load_quotes(&durable);
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    quotes,
                    durable: Box::new(durable),
                }),
                session: Mutex::new(Box::new(session)),
                load_outcome,
            }),
        }
    }

    /// How the contents were obtained when the store was opened.
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.inner.load_outcome
    }

    /// Re-reads durable storage, replacing memory.
    pub fn reload(&self) -> LoadOutcome {
        let mut state = self.lock_state();
        let (quotes, outcome) = load_quotes(state.durable.as_ref());
        state.quotes = quotes;
        outcome
    }

    /// Snapshot of the current contents in insertion order.
    pub fn quotes(&self) -> Vec<Quote> {
        self.lock_state().quotes.clone()
    }

    pub fn len(&self) -> usize {
        self.lock_state().quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().quotes.is_empty()
    }

    /// Writes the current contents to durable storage.
    pub fn save(&self) -> PersistStatus {
        self.lock_state().persist()
    }

    /// Appends one quote from user input.
    ///
    /// # Errors
    /// - Returns a validation error, with no mutation, when either field is
    ///   blank after trimming.
    pub fn add(
        &self,
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> Result<AddOutcome, QuoteValidationError> {
        let quote = Quote::new(text, category).inspect_err(|err| {
            info!("event=quote_add module=store status=rejected reason={err}");
        })?;

        let persist = {
            let mut state = self.lock_state();
            state.quotes.push(quote.clone());
            let persist = state.persist();
            info!(
                "event=quote_add module=store status=ok count={} saved={}",
                state.quotes.len(),
                persist.is_saved()
            );
            persist
        };

        Ok(AddOutcome { quote, persist })
    }

    /// Imports a JSON array of quotes.
    ///
    /// Entries whose exact `(text, category)` pair already exists, in the
    /// store or earlier in the same batch, are skipped. Durable storage is
    /// written once, and only when something was added.
    ///
    /// # Errors
    /// - Returns a payload error, with no mutation, when `raw_json` is not
    ///   JSON or its top level is not an array.
    pub fn import_batch(&self, raw_json: &str) -> Result<ImportReport, ImportError> {
        let (candidates, invalid) = decode_quotes_lenient(raw_json).inspect_err(|err| {
            info!("event=quote_import module=store status=rejected error={err}");
        })?;

        let mut state = self.lock_state();
        let mut added = 0;
        let mut duplicates = 0;
        for quote in candidates {
            if state.quotes.iter().any(|existing| existing.same_entry(&quote)) {
                duplicates += 1;
            } else {
                state.quotes.push(quote);
                added += 1;
            }
        }
        let persist = (added > 0).then(|| state.persist());

        info!(
            "event=quote_import module=store status=ok added={added} duplicates={duplicates} invalid={invalid} count={}",
            state.quotes.len()
        );
        Ok(ImportReport {
            added,
            duplicates,
            invalid,
            persist,
        })
    }

    /// Imports a `.json` file from disk.
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportReport, ImportError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(ImportError::UnsupportedFile(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        self.import_batch(&raw)
    }

    /// Pretty-printed export of the current contents, named for `now`.
    pub fn export_blob_at(&self, now: DateTime<Utc>) -> ExportBlob {
        let state = self.lock_state();
        // Vec<Quote> of plain strings always serializes.
        let bytes = serde_json::to_vec_pretty(&state.quotes).unwrap_or_else(|_| b"[]".to_vec());
        ExportBlob {
            bytes,
            filename: format!("quotes-{}.json", now.format("%Y%m%d-%H%M%S")),
        }
    }

    pub fn export_blob(&self) -> ExportBlob {
        self.export_blob_at(Utc::now())
    }

    /// Writes an export into `dir` and returns the created file path.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let blob = self.export_blob();
        let path = dir.as_ref().join(&blob.filename);
        std::fs::write(&path, &blob.bytes)?;
        info!(
            "event=quote_export module=store status=ok bytes={}",
            blob.bytes.len()
        );
        Ok(path)
    }

    /// Replaces the whole contents and persists them.
    pub fn replace_all(&self, quotes: Vec<Quote>) -> PersistStatus {
        self.update(move |current| *current = quotes).1
    }

    /// Runs `f` on the contents under the store lock, then persists.
    ///
    /// This is the atomic read-modify-write primitive used for whole-store
    /// rewrites such as reconciliation.
    pub fn update<T>(&self, f: impl FnOnce(&mut Vec<Quote>) -> T) -> (T, PersistStatus) {
        let mut state = self.lock_state();
        let value = f(&mut state.quotes);
        let persist = state.persist();
        (value, persist)
    }

    /// Picks a random quote for `filter` and records it as last viewed.
    pub fn show_random<R: Rng + ?Sized>(
        &self,
        filter: &CategoryFilter,
        rng: &mut R,
    ) -> Option<Quote> {
        let picked = {
            let state = self.lock_state();
            pick(&state.quotes, filter, rng).cloned()
        }?;
        self.record_last_viewed(&picked);
        Some(picked)
    }

    /// Quote shown most recently in this session.
    pub fn last_viewed(&self) -> Option<Quote> {
        let raw = match self.lock_session().get(LAST_VIEWED_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("event=last_viewed_read module=store status=error error={err}");
                return None;
            }
        };
        let value = serde_json::from_str(&raw).ok()?;
        decode_quote(&value).ok()
    }

    /// Persists the selected category filter durably.
    pub fn remember_filter(&self, filter: &CategoryFilter) -> PersistStatus {
        let state = self.lock_state();
        match state.durable.set(LAST_FILTER_KEY, filter.as_str()) {
            Ok(()) => PersistStatus::Saved,
            Err(err) => {
                warn!("event=filter_save module=store status=error error={err}");
                PersistStatus::Failed(format!("filter could not be saved: {err}"))
            }
        }
    }

    /// Filter remembered by a previous `remember_filter`, in any session.
    pub fn last_filter(&self) -> Option<CategoryFilter> {
        match self.lock_state().durable.get(LAST_FILTER_KEY) {
            Ok(value) => value
                .filter(|value| !value.trim().is_empty())
                .map(|value| CategoryFilter::parse(&value)),
            Err(err) => {
                warn!("event=filter_read module=store status=error error={err}");
                None
            }
        }
    }

    fn record_last_viewed(&self, quote: &Quote) {
        let Ok(encoded) = serde_json::to_string(quote) else {
            return;
        };
        if let Err(err) = self.lock_session().set(LAST_VIEWED_KEY, &encoded) {
            warn!("event=last_viewed_save module=store status=error error={err}");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_session(&self) -> MutexGuard<'_, Box<dyn KvRepository>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
