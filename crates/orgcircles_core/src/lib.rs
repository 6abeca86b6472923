//! Core domain logic for the circle-based organization workspace.
//! This crate is the single source of truth for organization invariants.

pub mod config;
pub mod db;
pub mod error;
pub mod focus;
pub mod layout;
pub mod logging;
pub mod model;
pub mod org;
pub mod repo;
pub mod service;

pub use config::{ConfigError, LoggingConfig, WorkspaceConfig};
pub use error::{ErrorKind, NameField, OrgError, OrgResult};
pub use focus::{FocusConfig, FocusController, LabelState, ViewWindow};
pub use layout::{LayoutRecord, PackLayout, PackLayoutConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogTarget,
};
pub use model::{
    Member, MemberId, NodeId, NodeKind, OrgNode, OrganizationNode, Snapshot, Template, TemplateId,
};
pub use org::{Confirmation, InvariantViolation, Organization, RoleEditOutcome, SnapshotError};
pub use repo::{InMemorySnapshotStore, SnapshotStore, SqliteSnapshotStore, StoreError};
pub use service::{Committed, Frame, FrameNode, WorkspaceService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
