//! Snapshot persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the `SnapshotStore` collaborator used by the workspace service.
//! - Persist whole-model snapshots as one JSON document per save.
//!
//! # Invariants
//! - `save` replaces the current document atomically; there are no partial
//!   writes.
//! - Undecodable stored data surfaces as `StoreError::InvalidData`, never a
//!   panic.
//! - SQLite saves keep at most `HISTORY_LIMIT` history rows per slot.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::Snapshot;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by snapshot stores.
pub type StoreResult<T> = Result<T, StoreError>;

/// Slot holding the live snapshot.
pub const CURRENT_SLOT: &str = "current";
/// History rows kept per slot.
pub const HISTORY_LIMIT: u32 = 20;

/// Errors from snapshot persistence.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Snapshot could not be encoded.
    Encode(serde_json::Error),
    /// Stored data cannot be decoded into a snapshot.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Store refused the write (used by hosts and test doubles).
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode snapshot: {err}"),
            Self::InvalidData(message) => write!(f, "invalid stored snapshot: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "snapshot store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Unavailable(message) => write!(f, "snapshot store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl StoreError {
    /// Short machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::Encode(_) => "encode_failed",
            Self::InvalidData(_) => "invalid_data",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// External persistence collaborator.
pub trait SnapshotStore {
    /// Returns the last saved snapshot, or `None` when nothing was saved yet.
    fn load(&self) -> StoreResult<Option<Snapshot>>;

    /// Replaces the stored snapshot.
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()>;
}

/// Metadata of one history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSnapshot {
    pub format_version: u32,
    /// Epoch ms save timestamp.
    pub saved_at: i64,
}

/// SQLite-backed snapshot store.
pub struct SqliteSnapshotStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Most recent saves, newest first.
    pub fn history(&self, limit: u32) -> StoreResult<Vec<SavedSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT format_version, saved_at
             FROM org_snapshot_history
             WHERE slot = ?1
             ORDER BY saved_at DESC, id DESC
             LIMIT ?2;",
        )?;
        let rows = stmt.query_map(params![CURRENT_SLOT, limit], |row| {
            Ok(SavedSnapshot {
                format_version: row.get(0)?,
                saved_at: row.get(1)?,
            })
        })?;
        let mut saves = Vec::new();
        for row in rows {
            saves.push(row?);
        }
        Ok(saves)
    }
}

impl SnapshotStore for SqliteSnapshotStore<'_> {
    fn load(&self) -> StoreResult<Option<Snapshot>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM org_snapshots WHERE slot = ?1;",
                [CURRENT_SLOT],
                |row| row.get(0),
            )
            .optional()?;
        payload.map(|text| decode(&text)).transpose()
    }

    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let payload = snapshot.to_json().map_err(StoreError::Encode)?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO org_snapshots (slot, format_version, payload, saved_at)
             VALUES (?1, ?2, ?3, CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             ON CONFLICT(slot) DO UPDATE SET
                 format_version = excluded.format_version,
                 payload = excluded.payload,
                 saved_at = excluded.saved_at;",
            params![CURRENT_SLOT, snapshot.format_version, payload],
        )?;
        tx.execute(
            "INSERT INTO org_snapshot_history (slot, format_version, payload, saved_at)
             VALUES (?1, ?2, ?3, CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER));",
            params![CURRENT_SLOT, snapshot.format_version, payload],
        )?;
        tx.execute(
            "DELETE FROM org_snapshot_history
             WHERE slot = ?1
               AND id NOT IN (
                   SELECT id FROM org_snapshot_history
                   WHERE slot = ?1
                   ORDER BY saved_at DESC, id DESC
                   LIMIT ?2
               );",
            params![CURRENT_SLOT, HISTORY_LIMIT],
        )?;
        tx.commit()?;
        Ok(())
    }
}

/// In-memory store keeping the encoded JSON text.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    document: RefCell<Option<String>>,
    fail_saves: Option<String>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw document text, valid or not.
    pub fn with_document(text: impl Into<String>) -> Self {
        Self {
            document: RefCell::new(Some(text.into())),
            fail_saves: None,
        }
    }

    /// Store whose saves always fail with `StoreError::Unavailable`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            document: RefCell::new(None),
            fail_saves: Some(reason.into()),
        }
    }

    /// Raw stored text, if any.
    pub fn document(&self) -> Option<String> {
        self.document.borrow().clone()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> StoreResult<Option<Snapshot>> {
        self.document
            .borrow()
            .as_deref()
            .map(decode)
            .transpose()
    }

    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if let Some(reason) = &self.fail_saves {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        let payload = snapshot.to_json().map_err(StoreError::Encode)?;
        self.document.replace(Some(payload));
        Ok(())
    }
}

fn decode(text: &str) -> StoreResult<Snapshot> {
    Snapshot::from_json(text).map_err(|err| StoreError::InvalidData(err.to_string()))
}
