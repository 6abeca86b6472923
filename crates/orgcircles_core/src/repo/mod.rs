//! Persistence collaborators.
//!
//! # Responsibility
//! - Define the snapshot store contract used by the workspace service.
//! - Keep SQLite and JSON encoding details out of the model.
//!
//! # Invariants
//! - Stores persist whole snapshots only; there is no partial-write path.

pub mod snapshot_repo;

pub use snapshot_repo::{
    InMemorySnapshotStore, SavedSnapshot, SnapshotStore, SqliteSnapshotStore, StoreError,
    StoreResult, CURRENT_SLOT, HISTORY_LIMIT,
};
