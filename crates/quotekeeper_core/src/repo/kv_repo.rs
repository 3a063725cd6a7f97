//! Key-value repository contract with durable and session implementations.
//!
//! # Responsibility
//! - `SqliteKvRepository`: durable records that survive process restarts.
//! - `MemoryKvRepository`: session records that die with the process, with an
//!   optional byte quota.
//!
//! # Invariants
//! - A failed `set` leaves the previous value for that key untouched.

use crate::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage error for key-value reads and writes.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    QuotaExceeded {
        key: String,
        required_bytes: usize,
        quota_bytes: usize,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded {
                key,
                required_bytes,
                quota_bytes,
            } => write!(
                f,
                "storage quota exceeded writing `{key}`: {required_bytes} bytes needed, quota is {quota_bytes}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for string records addressed by key.
pub trait KvRepository: Send {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed durable key-value repository.
pub struct SqliteKvRepository {
    conn: Connection,
}

impl SqliteKvRepository {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl KvRepository for SqliteKvRepository {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_records WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_records (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryState {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, value)| existing.len() + value.len())
            .sum()
    }
}

/// In-process key-value repository.
///
/// Clones share the same entries, so a caller can keep a handle to a
/// repository it has handed to a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository that rejects writes once keys plus values would
    /// exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        let repo = Self::default();
        repo.set_quota(Some(quota_bytes));
        repo
    }

    /// Changes or clears the byte quota. Existing entries are kept.
    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        self.lock().quota_bytes = quota_bytes;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KvRepository for MemoryKvRepository {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        let mut state = self.lock();
        if let Some(quota_bytes) = state.quota_bytes {
            let required_bytes = state.used_bytes_without(key) + key.len() + value.len();
            if required_bytes > quota_bytes {
                return Err(RepoError::QuotaExceeded {
                    key: key.to_string(),
                    required_bytes,
                    quota_bytes,
                });
            }
        }
        state.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{KvRepository, MemoryKvRepository, RepoError, SqliteKvRepository};

    #[test]
    fn sqlite_set_overwrites_existing_value() {
        let repo = SqliteKvRepository::open_in_memory().unwrap();
        assert_eq!(repo.get("quotes").unwrap(), None);

        repo.set("quotes", "[1]").unwrap();
        repo.set("quotes", "[2]").unwrap();
        assert_eq!(repo.get("quotes").unwrap().as_deref(), Some("[2]"));
        assert_eq!(repo.get("lastSelectedCategory").unwrap(), None);
    }

    #[test]
    fn memory_clones_share_entries() {
        let repo = MemoryKvRepository::new();
        let handle = repo.clone();
        repo.set("k", "v").unwrap();
        assert_eq!(handle.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn memory_quota_rejects_oversized_write_and_keeps_previous_value() {
        let repo = MemoryKvRepository::with_quota(8);
        repo.set("k", "small").unwrap();

        let err = repo.set("k", "much too large").unwrap_err();
        assert!(matches!(
            err,
            RepoError::QuotaExceeded { quota_bytes: 8, .. }
        ));
        assert_eq!(repo.get("k").unwrap().as_deref(), Some("small"));

        repo.set_quota(None);
        repo.set("k", "much too large").unwrap();
    }
}
