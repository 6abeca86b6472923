//! Organization tree node model.
//!
//! # Responsibility
//! - Define the per-node record stored by the tree arena.
//! - Define the nested node shape used inside snapshots.
//!
//! # Invariants
//! - `Role` and `TemplateInstance` nodes never have children.
//! - `template_id` is set iff `kind == NodeKind::TemplateInstance`.
//! - `driver` is only meaningful for circles and plain roles.

use crate::model::id::{MemberId, NodeId, TemplateId};
use crate::model::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of an organization tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Container that can hold circles, roles and template instances.
    Circle,
    /// Leaf position that members can be assigned to.
    Role,
    /// Role leaf materialized from a template and kept in sync with it.
    TemplateInstance,
}

impl NodeKind {
    /// Returns whether nodes of this kind are role leaves.
    pub fn is_role(self) -> bool {
        matches!(self, Self::Role | Self::TemplateInstance)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Role => "role",
            Self::TemplateInstance => "template_instance",
        }
    }
}

/// One node of the organization tree, without its structural links.
///
/// Parent and child links live in the tree arena so that structural edits
/// can only happen through Tree Store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub description: String,
    pub driver: String,
    /// Members assigned directly to this role leaf. Always empty for circles.
    pub member_ids: BTreeSet<MemberId>,
    /// Originating template for `TemplateInstance` nodes.
    pub template_id: Option<TemplateId>,
}

impl OrgNode {
    pub fn circle(
        id: NodeId,
        name: impl Into<String>,
        description: impl Into<String>,
        driver: impl Into<String>,
    ) -> Self {
        Self::with_kind(id, NodeKind::Circle, name, description, driver)
    }

    pub fn role(
        id: NodeId,
        name: impl Into<String>,
        description: impl Into<String>,
        driver: impl Into<String>,
    ) -> Self {
        Self::with_kind(id, NodeKind::Role, name, description, driver)
    }

    /// Materializes a template into a leaf carrying its current name/description.
    pub fn template_instance(id: NodeId, template: &Template) -> Self {
        let mut node = Self::with_kind(
            id,
            NodeKind::TemplateInstance,
            template.name.clone(),
            template.description.clone(),
            String::new(),
        );
        node.template_id = Some(template.id);
        node
    }

    fn with_kind(
        id: NodeId,
        kind: NodeKind,
        name: impl Into<String>,
        description: impl Into<String>,
        driver: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            description: description.into(),
            driver: driver.into(),
            member_ids: BTreeSet::new(),
            template_id: None,
        }
    }

    pub fn is_circle(&self) -> bool {
        self.kind == NodeKind::Circle
    }

    pub fn is_role(&self) -> bool {
        self.kind.is_role()
    }

    /// Returns whether this node instantiates `template_id`.
    pub fn instantiates(&self, template_id: TemplateId) -> bool {
        self.kind == NodeKind::TemplateInstance && self.template_id == Some(template_id)
    }

    /// Case-insensitive name comparison used by role merge detection.
    pub fn name_matches(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.trim().to_lowercase()
    }
}

/// Nested node shape stored in snapshots.
///
/// Serialized as `type` to match the external schema naming; optional
/// collections default to empty so hand-written or older documents load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OrganizationNode>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub member_ids: BTreeSet<MemberId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
}

impl OrganizationNode {
    /// Builds a childless nested node from an arena record.
    pub fn from_record(node: &OrgNode) -> Self {
        Self {
            id: node.id,
            kind: node.kind,
            name: node.name.clone(),
            description: node.description.clone(),
            driver: node.driver.clone(),
            children: Vec::new(),
            member_ids: node.member_ids.clone(),
            template_id: node.template_id,
        }
    }

    /// Splits off the arena record, leaving structural links behind.
    pub fn to_record(&self) -> OrgNode {
        OrgNode {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            driver: self.driver.clone(),
            member_ids: self.member_ids.clone(),
            template_id: self.template_id,
        }
    }

    /// Counts this node and all of its descendants.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(OrganizationNode::subtree_len)
            .sum::<usize>()
    }
}
