//! Organization model context.
//!
//! # Responsibility
//! - Own the tree arena, the member list, the template catalog and the id
//!   generator as one explicit context object.
//! - Convert to and from persisted snapshots.
//! - Check the full invariant set on demand.
//!
//! # Invariants
//! - Every public mutation lives in `tree_store`, `membership` or
//!   `templates` and validates before it mutates.
//! - `check_invariants` holds between any two public operations.
//!
//! # See also
//! - src/service/workspace_service.rs for the command surface built on top

mod membership;
mod queries;
mod templates;
mod tree;
mod tree_store;

pub use membership::Confirmation;
pub use queries::{CircleRoster, RosterRole};
pub use tree::{OrgTree, TreeShapeError};
pub use tree_store::RoleEditOutcome;

use crate::error::{NameField, OrgError, OrgResult};
use crate::model::{
    IdGenerator, Member, MemberId, NodeId, OrgNode, RandomIdGenerator, Snapshot, Template,
    TemplateId, SNAPSHOT_FORMAT_VERSION,
};
use log::warn;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reasons a snapshot cannot become an `Organization`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Document version is newer than this build understands.
    UnsupportedFormatVersion { found: u32, supported: u32 },
    /// Tree shape breaks a structural invariant.
    Shape(TreeShapeError),
    /// Two templates share an id.
    DuplicateTemplateId(TemplateId),
    /// Two templates share a name, compared case-insensitively.
    DuplicateTemplateName(String),
    /// Two members share an id.
    DuplicateMemberId(MemberId),
    /// A template instance points at a template that is not in the catalog.
    UnknownTemplate { node_id: NodeId, template_id: TemplateId },
    /// One circle holds two instances of the same template.
    RepeatedTemplateInstance { circle_id: NodeId, template_id: TemplateId },
    /// A circle with children holds no instance of a template.
    MissingTemplateInstance { circle_id: NodeId, template_id: TemplateId },
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormatVersion { found, supported } => write!(
                f,
                "snapshot format version {found} is newer than supported {supported}"
            ),
            Self::Shape(err) => write!(f, "invalid tree shape: {err}"),
            Self::DuplicateTemplateId(id) => write!(f, "duplicate template id: {id}"),
            Self::DuplicateTemplateName(name) => write!(f, "duplicate template name: `{name}`"),
            Self::DuplicateMemberId(id) => write!(f, "duplicate member id: {id}"),
            Self::UnknownTemplate {
                node_id,
                template_id,
            } => write!(
                f,
                "node {node_id} references unknown template {template_id}"
            ),
            Self::RepeatedTemplateInstance {
                circle_id,
                template_id,
            } => write!(
                f,
                "circle {circle_id} holds template {template_id} more than once"
            ),
            Self::MissingTemplateInstance {
                circle_id,
                template_id,
            } => write!(
                f,
                "circle {circle_id} has children but no instance of template {template_id}"
            ),
        }
    }
}

impl SnapshotError {
    /// Short machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormatVersion { .. } => "unsupported_format_version",
            Self::Shape(_) => "invalid_tree_shape",
            Self::DuplicateTemplateId(_) => "duplicate_template_id",
            Self::DuplicateTemplateName(_) => "duplicate_template_name",
            Self::DuplicateMemberId(_) => "duplicate_member_id",
            Self::UnknownTemplate { .. } => "unknown_template",
            Self::RepeatedTemplateInstance { .. } => "repeated_template_instance",
            Self::MissingTemplateInstance { .. } => "missing_template_instance",
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeShapeError> for SnapshotError {
    fn from(value: TreeShapeError) -> Self {
        Self::Shape(value)
    }
}

/// A broken invariant found by [`Organization::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Parent/child links, root shape or reachability are inconsistent.
    Structure(String),
    /// A template instance points at a missing template.
    DanglingTemplate { node_id: NodeId, template_id: TemplateId },
    /// One circle holds two instances of the same template.
    RepeatedTemplateInstance { circle_id: NodeId, template_id: TemplateId },
    /// A circle with children lacks an instance of a template.
    MissingTemplateInstance { circle_id: NodeId, template_id: TemplateId },
    /// `role ∈ member.assignments` disagrees with `member ∈ role.member_ids`.
    AssignmentMismatch { member_id: MemberId, role_id: NodeId },
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structure(detail) => write!(f, "tree structure violated: {detail}"),
            Self::DanglingTemplate {
                node_id,
                template_id,
            } => write!(
                f,
                "node {node_id} references missing template {template_id}"
            ),
            Self::RepeatedTemplateInstance {
                circle_id,
                template_id,
            } => write!(
                f,
                "circle {circle_id} holds template {template_id} more than once"
            ),
            Self::MissingTemplateInstance {
                circle_id,
                template_id,
            } => write!(
                f,
                "circle {circle_id} has children but no instance of template {template_id}"
            ),
            Self::AssignmentMismatch { member_id, role_id } => write!(
                f,
                "assignment link between member {member_id} and role {role_id} is one-sided"
            ),
        }
    }
}

impl Error for InvariantViolation {}

/// The whole organization model: tree, members and templates.
#[derive(Debug)]
pub struct Organization {
    tree: OrgTree,
    members: Vec<Member>,
    templates: Vec<Template>,
    ids: Box<dyn IdGenerator>,
}

impl Default for Organization {
    fn default() -> Self {
        Self::new()
    }
}

impl Organization {
    /// Default model with random ids: one root circle, nothing else.
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(RandomIdGenerator))
    }

    /// Default model drawing every id from `ids`.
    pub fn with_id_generator(mut ids: Box<dyn IdGenerator>) -> Self {
        let root_id = ids.next_id();
        let snapshot = Snapshot::with_default_root(root_id);
        Self {
            tree: OrgTree::new(snapshot.tree.to_record()),
            members: Vec::new(),
            templates: Vec::new(),
            ids,
        }
    }

    /// Rebuilds a model from a snapshot, drawing new ids at random.
    ///
    /// Structural problems are rejected. One-sided or dangling membership
    /// links are repaired and counted in a warning.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedFormatVersion {
                found: snapshot.format_version,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }

        let tree = OrgTree::from_nested(&snapshot.tree)?;

        let mut template_ids = HashSet::new();
        let mut template_names = HashSet::new();
        for template in &snapshot.templates {
            if !template_ids.insert(template.id) {
                return Err(SnapshotError::DuplicateTemplateId(template.id));
            }
            if !template_names.insert(template.name.trim().to_lowercase()) {
                return Err(SnapshotError::DuplicateTemplateName(template.name.clone()));
            }
        }

        let mut member_ids = HashSet::new();
        for member in &snapshot.members {
            if !member_ids.insert(member.id) {
                return Err(SnapshotError::DuplicateMemberId(member.id));
            }
        }

        let mut organization = Self {
            tree,
            members: snapshot.members.clone(),
            templates: snapshot.templates.clone(),
            ids: Box::new(RandomIdGenerator),
        };
        if let Some(fault) = organization.template_fault() {
            return Err(fault.into());
        }

        let repaired = organization.reconcile_memberships();
        if repaired > 0 {
            warn!("event=snapshot_reconcile module=org status=repaired links={repaired}");
        }
        Ok(organization)
    }

    /// Replaces the id generator used for entities created from now on.
    pub fn with_ids(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Captures the complete model as plain data.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            tree: self.tree.to_nested(),
            members: self.members.clone(),
            templates: self.templates.clone(),
        }
    }

    pub fn tree(&self) -> &OrgTree {
        &self.tree
    }

    pub fn root_id(&self) -> NodeId {
        self.tree.root_id()
    }

    /// Looks up one node by id.
    pub fn find_node(&self, id: NodeId) -> Option<&OrgNode> {
        self.tree.find_node(id)
    }

    /// Returns whether `node` lies strictly inside `ancestor_candidate`'s subtree.
    pub fn is_descendant(&self, ancestor_candidate: NodeId, node: NodeId) -> bool {
        self.tree.is_descendant(ancestor_candidate, node)
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    /// Templates in creation order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.iter().find(|template| template.id == id)
    }

    /// Verifies the full invariant set.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if let Some(detail) = self.tree.structural_violation() {
            return Err(InvariantViolation::Structure(detail));
        }
        if let Some(fault) = self.template_fault() {
            return Err(fault.into());
        }
        self.membership_violation().map_or(Ok(()), Err)
    }

    fn template_fault(&self) -> Option<TemplateFault> {
        let known: HashSet<TemplateId> = self.templates.iter().map(|t| t.id).collect();
        for circle_id in self.tree.circles() {
            let mut seen = HashSet::new();
            for child_id in self.tree.children(circle_id) {
                let Some(template_id) = self.tree.find_node(*child_id).and_then(|n| n.template_id)
                else {
                    continue;
                };
                if !known.contains(&template_id) {
                    return Some(TemplateFault::Dangling {
                        node_id: *child_id,
                        template_id,
                    });
                }
                if !seen.insert(template_id) {
                    return Some(TemplateFault::Repeated {
                        circle_id,
                        template_id,
                    });
                }
            }
            if !self.tree.has_children(circle_id) {
                continue;
            }
            if let Some(template) = self.templates.iter().find(|t| !seen.contains(&t.id)) {
                return Some(TemplateFault::Missing {
                    circle_id,
                    template_id: template.id,
                });
            }
        }
        None
    }

    fn membership_violation(&self) -> Option<InvariantViolation> {
        let members: HashMap<MemberId, &Member> =
            self.members.iter().map(|member| (member.id, member)).collect();
        for member in &self.members {
            for role_id in &member.assignments {
                let linked = self
                    .tree
                    .find_node(*role_id)
                    .is_some_and(|role| role.is_role() && role.member_ids.contains(&member.id));
                if !linked {
                    return Some(InvariantViolation::AssignmentMismatch {
                        member_id: member.id,
                        role_id: *role_id,
                    });
                }
            }
        }
        for node_id in self.tree.preorder() {
            let Some(node) = self.tree.find_node(node_id) else {
                continue;
            };
            for member_id in &node.member_ids {
                let linked = node.is_role()
                    && members
                        .get(member_id)
                        .is_some_and(|member| member.holds(node_id));
                if !linked {
                    return Some(InvariantViolation::AssignmentMismatch {
                        member_id: *member_id,
                        role_id: node_id,
                    });
                }
            }
        }
        None
    }

    pub(crate) fn next_id(&mut self) -> uuid::Uuid {
        self.ids.next_id()
    }
}

enum TemplateFault {
    Dangling { node_id: NodeId, template_id: TemplateId },
    Repeated { circle_id: NodeId, template_id: TemplateId },
    Missing { circle_id: NodeId, template_id: TemplateId },
}

impl From<TemplateFault> for SnapshotError {
    fn from(value: TemplateFault) -> Self {
        match value {
            TemplateFault::Dangling {
                node_id,
                template_id,
            } => Self::UnknownTemplate {
                node_id,
                template_id,
            },
            TemplateFault::Repeated {
                circle_id,
                template_id,
            } => Self::RepeatedTemplateInstance {
                circle_id,
                template_id,
            },
            TemplateFault::Missing {
                circle_id,
                template_id,
            } => Self::MissingTemplateInstance {
                circle_id,
                template_id,
            },
        }
    }
}

impl From<TemplateFault> for InvariantViolation {
    fn from(value: TemplateFault) -> Self {
        match value {
            TemplateFault::Dangling {
                node_id,
                template_id,
            } => Self::DanglingTemplate {
                node_id,
                template_id,
            },
            TemplateFault::Repeated {
                circle_id,
                template_id,
            } => Self::RepeatedTemplateInstance {
                circle_id,
                template_id,
            },
            TemplateFault::Missing {
                circle_id,
                template_id,
            } => Self::MissingTemplateInstance {
                circle_id,
                template_id,
            },
        }
    }
}

/// Trims a user-supplied name, rejecting blank input.
pub(crate) fn normalize_name(raw: &str, field: NameField) -> OrgResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OrgError::EmptyName(field));
    }
    Ok(trimmed.to_string())
}
