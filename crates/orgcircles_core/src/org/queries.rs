//! Read-side queries used by editing surfaces.

use crate::model::{Member, MemberId, NodeId, NodeKind, Template};
use crate::org::Organization;
use std::cmp::Ordering;
use std::collections::HashSet;

/// One role leaf listed by [`Organization::circle_roster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRole {
    pub role_id: NodeId,
    pub name: String,
    pub is_template: bool,
    /// Assigned members sorted by name.
    pub member_ids: Vec<MemberId>,
}

/// Roles and staffing of one circle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleRoster {
    pub circle_id: NodeId,
    pub roles: Vec<RosterRole>,
    /// Members holding no role leaf anywhere under the circle, sorted by name.
    pub unassigned: Vec<MemberId>,
}

impl Organization {
    /// Lists role leaves under `circle_id`, template instances first.
    ///
    /// The root roster only lists template instances. Returns `None` when the
    /// id is unknown or not a circle.
    pub fn circle_roster(&self, circle_id: NodeId) -> Option<CircleRoster> {
        if !self.tree.find_node(circle_id)?.is_circle() {
            return None;
        }
        let is_root = circle_id == self.tree.root_id();
        let leaves = self.tree.role_leaves(circle_id);

        let mut roles: Vec<RosterRole> = leaves
            .iter()
            .filter_map(|id| self.tree.find_node(*id))
            .filter(|node| !is_root || node.kind == NodeKind::TemplateInstance)
            .map(|node| RosterRole {
                role_id: node.id,
                name: node.name.clone(),
                is_template: node.kind == NodeKind::TemplateInstance,
                member_ids: self.sorted_member_ids(node.member_ids.iter().copied()),
            })
            .collect();
        roles.sort_by(|a, b| {
            b.is_template
                .cmp(&a.is_template)
                .then_with(|| compare_names(&a.name, &b.name))
        });

        let staffed: HashSet<MemberId> = leaves
            .iter()
            .filter_map(|id| self.tree.find_node(*id))
            .flat_map(|node| node.member_ids.iter().copied())
            .collect();
        let unassigned = self.sorted_member_ids(
            self.members
                .iter()
                .map(|member| member.id)
                .filter(|id| !staffed.contains(id)),
        );

        Some(CircleRoster {
            circle_id,
            roles,
            unassigned,
        })
    }

    /// Circles `node_id` may be moved under, in pre-order.
    ///
    /// Excludes the node itself, its descendants and its current parent.
    pub fn move_targets(&self, node_id: NodeId) -> Vec<NodeId> {
        if !self.tree.contains(node_id) {
            return Vec::new();
        }
        let current_parent = self.tree.parent(node_id);
        self.tree
            .circles()
            .into_iter()
            .filter(|circle_id| {
                *circle_id != node_id
                    && Some(*circle_id) != current_parent
                    && !self.tree.is_descendant(node_id, *circle_id)
            })
            .collect()
    }

    /// Templates that can still be instantiated in `circle_id`, sorted by name.
    ///
    /// A template is unavailable when the circle already holds an instance of
    /// it or a role leaf with the same name.
    pub fn available_templates(&self, circle_id: NodeId) -> Vec<&Template> {
        if !self.tree.find_node(circle_id).is_some_and(|n| n.is_circle()) {
            return Vec::new();
        }
        let children: Vec<_> = self
            .tree
            .children(circle_id)
            .iter()
            .filter_map(|id| self.tree.find_node(*id))
            .filter(|node| node.is_role())
            .collect();
        let mut available: Vec<&Template> = self
            .templates
            .iter()
            .filter(|template| {
                !children
                    .iter()
                    .any(|node| node.instantiates(template.id) || node.name_matches(&template.name))
            })
            .collect();
        available.sort_by(|a, b| compare_names(&a.name, &b.name));
        available
    }

    fn sorted_member_ids(&self, ids: impl Iterator<Item = MemberId>) -> Vec<MemberId> {
        let mut members: Vec<&Member> = ids.filter_map(|id| self.member(id)).collect();
        members.sort_by(|a, b| compare_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));
        members.into_iter().map(|member| member.id).collect()
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
