//! Organization domain model.
//!
//! # Responsibility
//! - Define the canonical records for circles, roles, members and templates.
//! - Define the nested, serializable snapshot shape exchanged with storage.
//!
//! # Invariants
//! - Every entity is identified by a stable `Uuid` that is never reused.
//! - Only `Circle` nodes carry children; role leaves carry member ids.

pub mod id;
pub mod member;
pub mod node;
pub mod snapshot;
pub mod template;

pub use id::{IdGenerator, MemberId, NodeId, RandomIdGenerator, SequentialIdGenerator, TemplateId};
pub use member::Member;
pub use node::{NodeKind, OrgNode, OrganizationNode};
pub use snapshot::{Snapshot, SNAPSHOT_FORMAT_VERSION};
pub use template::Template;
