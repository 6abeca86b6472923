//! Domain error contracts for organization mutations.
//!
//! # Responsibility
//! - Name every way a Tree Store, Membership Index or Template Registry
//!   operation can be rejected.
//! - Classify each rejection into one of four stable kinds for UI messaging.
//!
//! # Invariants
//! - An operation returning `Err(OrgError)` has not mutated the model.
//! - Persistence failures are never reported through `OrgError`.

use crate::model::{MemberId, NodeId, TemplateId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by organization model operations.
pub type OrgResult<T> = Result<T, OrgError>;

/// Coarse classification of an [`OrgError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required field is empty or a referenced entity has the wrong kind.
    Validation,
    /// A referenced node, member or template id does not exist.
    NotFound,
    /// The operation would break a structural invariant.
    Invariant,
    /// A name or instance collision where merge semantics do not apply.
    Duplicate,
}

/// Which user-facing field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    Circle,
    Role,
    Member,
    Template,
}

impl Display for NameField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Circle => "circle",
            Self::Role => "role",
            Self::Member => "member",
            Self::Template => "template",
        };
        f.write_str(label)
    }
}

/// Errors from organization model operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgError {
    /// Name is blank after trim.
    EmptyName(NameField),
    /// Target node does not exist.
    NodeNotFound(NodeId),
    /// Parent node does not exist.
    ParentNotFound(NodeId),
    /// Parent exists but is not a circle.
    ParentMustBeCircle(NodeId),
    /// Target node exists but is not a circle.
    NodeMustBeCircle(NodeId),
    /// Target node exists but is not a role leaf.
    NodeMustBeRole(NodeId),
    /// Role leaf has no parent to detach from.
    RoleHasNoParent(NodeId),
    /// Member does not exist.
    MemberNotFound(MemberId),
    /// Template does not exist.
    TemplateNotFound(TemplateId),
    /// The root circle cannot be deleted.
    CannotDeleteRoot(NodeId),
    /// Move would place a node inside itself or its own subtree.
    CycleDetected { node_id: NodeId, parent_id: NodeId },
    /// Another template already uses this name (case-insensitive).
    DuplicateTemplateName(String),
    /// The circle already holds an instance of this template.
    TemplateAlreadyInstantiated {
        circle_id: NodeId,
        template_id: TemplateId,
    },
    /// Template instances only change through their template.
    TemplateInstanceManaged(NodeId),
}

impl OrgError {
    /// Maps this error onto its stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName(_)
            | Self::ParentMustBeCircle(_)
            | Self::NodeMustBeCircle(_)
            | Self::NodeMustBeRole(_) => ErrorKind::Validation,
            Self::NodeNotFound(_)
            | Self::ParentNotFound(_)
            | Self::MemberNotFound(_)
            | Self::TemplateNotFound(_) => ErrorKind::NotFound,
            Self::RoleHasNoParent(_)
            | Self::CannotDeleteRoot(_)
            | Self::CycleDetected { .. }
            | Self::TemplateInstanceManaged(_) => ErrorKind::Invariant,
            Self::DuplicateTemplateName(_) | Self::TemplateAlreadyInstantiated { .. } => {
                ErrorKind::Duplicate
            }
        }
    }

    /// Short machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyName(_) => "empty_name",
            Self::NodeNotFound(_) => "node_not_found",
            Self::ParentNotFound(_) => "parent_not_found",
            Self::ParentMustBeCircle(_) => "parent_must_be_circle",
            Self::NodeMustBeCircle(_) => "node_must_be_circle",
            Self::NodeMustBeRole(_) => "node_must_be_role",
            Self::RoleHasNoParent(_) => "role_has_no_parent",
            Self::MemberNotFound(_) => "member_not_found",
            Self::TemplateNotFound(_) => "template_not_found",
            Self::CannotDeleteRoot(_) => "cannot_delete_root",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::DuplicateTemplateName(_) => "duplicate_template_name",
            Self::TemplateAlreadyInstantiated { .. } => "template_already_instantiated",
            Self::TemplateInstanceManaged(_) => "template_instance_managed",
        }
    }
}

impl Display for OrgError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName(field) => write!(f, "{field} name must not be blank"),
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent node not found: {id}"),
            Self::ParentMustBeCircle(id) => write!(f, "parent node must be a circle: {id}"),
            Self::NodeMustBeCircle(id) => write!(f, "node must be a circle: {id}"),
            Self::NodeMustBeRole(id) => write!(f, "node must be a role: {id}"),
            Self::RoleHasNoParent(id) => write!(f, "role has no parent: {id}"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::CannotDeleteRoot(id) => write!(f, "cannot delete the root circle: {id}"),
            Self::CycleDetected { node_id, parent_id } => write!(
                f,
                "move would create cycle: node {node_id} under parent {parent_id}"
            ),
            Self::DuplicateTemplateName(name) => {
                write!(f, "a template named `{name}` already exists")
            }
            Self::TemplateAlreadyInstantiated {
                circle_id,
                template_id,
            } => write!(
                f,
                "circle {circle_id} already holds an instance of template {template_id}"
            ),
            Self::TemplateInstanceManaged(id) => write!(
                f,
                "template instance {id} can only change through its template"
            ),
        }
    }
}

impl Error for OrgError {}
