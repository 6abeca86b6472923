//! Membership Index operations and member CRUD.
//!
//! # Responsibility
//! - Keep `Member::assignments` and role `member_ids` mutually consistent.
//! - Create, edit and delete members.
//!
//! # Invariants
//! - For every member `m` and role leaf `r`:
//!   `r ∈ m.assignments ⇔ m.id ∈ r.member_ids`.
//! - Circles never hold member ids.

use crate::error::{NameField, OrgError, OrgResult};
use crate::model::{Member, MemberId, NodeId};
use crate::org::{normalize_name, Organization};
use std::collections::HashSet;

/// Whether `unassign` must ask before removing a link.
#[derive(Clone, Copy)]
pub enum Confirmation<'a> {
    /// Remove without asking.
    NotRequired,
    /// Ask the host; a `false` answer cancels the removal.
    Required(&'a dyn Fn() -> bool),
}

impl Confirmation<'_> {
    fn granted(self) -> bool {
        match self {
            Self::NotRequired => true,
            Self::Required(ask) => ask(),
        }
    }
}

impl std::fmt::Debug for Confirmation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRequired => f.write_str("NotRequired"),
            Self::Required(_) => f.write_str("Required(..)"),
        }
    }
}

impl Organization {
    /// Creates a member with no assignments.
    pub fn add_member(&mut self, name: &str, description: &str) -> OrgResult<MemberId> {
        let name = normalize_name(name, NameField::Member)?;
        let id = self.next_id();
        self.members.push(Member::new(id, name, description.trim()));
        Ok(id)
    }

    pub fn edit_member(
        &mut self,
        member_id: MemberId,
        name: &str,
        description: &str,
    ) -> OrgResult<()> {
        let name = normalize_name(name, NameField::Member)?;
        let member = self
            .members
            .iter_mut()
            .find(|member| member.id == member_id)
            .ok_or(OrgError::MemberNotFound(member_id))?;
        member.name = name;
        member.description = description.trim().to_string();
        Ok(())
    }

    /// Releases every assignment of the member, then removes it.
    ///
    /// Returns how many assignments were released.
    pub fn delete_member(&mut self, member_id: MemberId) -> OrgResult<usize> {
        if self.member(member_id).is_none() {
            return Err(OrgError::MemberNotFound(member_id));
        }
        let released = self.release_all_for_member(member_id);
        self.members.retain(|member| member.id != member_id);
        Ok(released)
    }

    /// Returns whether both sides of the link exist.
    pub fn is_assigned(&self, member_id: MemberId, role_id: NodeId) -> bool {
        let member_side = self
            .member(member_id)
            .is_some_and(|member| member.holds(role_id));
        let role_side = self
            .tree
            .find_node(role_id)
            .is_some_and(|role| role.member_ids.contains(&member_id));
        member_side && role_side
    }

    /// Links a member to a role leaf.
    ///
    /// Returns `false` without changes when either id is unknown, the target
    /// is a circle, or the link already exists.
    pub fn assign(&mut self, member_id: MemberId, role_id: NodeId) -> bool {
        let Some(member) = self.members.iter_mut().find(|m| m.id == member_id) else {
            return false;
        };
        let Some(role) = self.tree.node_mut(role_id).filter(|node| node.is_role()) else {
            return false;
        };
        if member.assignments.contains(&role_id) && role.member_ids.contains(&member_id) {
            return false;
        }
        member.assignments.insert(role_id);
        role.member_ids.insert(member_id);
        true
    }

    /// Removes a member/role link.
    ///
    /// Returns `true` only when both sides were linked and the removal was
    /// not declined. Any one-sided leftover is cleaned either way.
    pub fn unassign(
        &mut self,
        member_id: MemberId,
        role_id: NodeId,
        confirmation: Confirmation<'_>,
    ) -> bool {
        let linked = self.is_assigned(member_id, role_id);
        if linked && !confirmation.granted() {
            return false;
        }
        self.unlink(member_id, role_id);
        linked
    }

    /// Unassigns when linked, otherwise assigns.
    pub fn toggle(&mut self, member_id: MemberId, role_id: NodeId) -> bool {
        if self.is_assigned(member_id, role_id) {
            self.unassign(member_id, role_id, Confirmation::NotRequired)
        } else {
            self.assign(member_id, role_id)
        }
    }

    /// Drops every link held by a member. Returns the number of roles released.
    pub fn release_all_for_member(&mut self, member_id: MemberId) -> usize {
        let Some(member) = self.members.iter_mut().find(|m| m.id == member_id) else {
            return 0;
        };
        let roles = std::mem::take(&mut member.assignments);
        for role_id in &roles {
            if let Some(role) = self.tree.node_mut(*role_id) {
                role.member_ids.remove(&member_id);
            }
        }
        roles.len()
    }

    /// Drops every link held by a role. Returns the number of members released.
    pub fn release_all_for_role(&mut self, role_id: NodeId) -> usize {
        let Some(role) = self.tree.node_mut(role_id) else {
            return 0;
        };
        let holders = std::mem::take(&mut role.member_ids);
        for member in self
            .members
            .iter_mut()
            .filter(|member| holders.contains(&member.id))
        {
            member.assignments.remove(&role_id);
        }
        holders.len()
    }

    fn unlink(&mut self, member_id: MemberId, role_id: NodeId) {
        if let Some(member) = self.members.iter_mut().find(|m| m.id == member_id) {
            member.assignments.remove(&role_id);
        }
        if let Some(role) = self.tree.node_mut(role_id) {
            role.member_ids.remove(&member_id);
        }
    }

    /// Repairs links after loading: dangling ends are dropped and one-sided
    /// links are completed. Returns how many link ends changed.
    pub(crate) fn reconcile_memberships(&mut self) -> usize {
        let mut repaired = 0;
        let member_ids: HashSet<MemberId> = self.members.iter().map(|m| m.id).collect();

        for node_id in self.tree.preorder() {
            let Some(node) = self.tree.node_mut(node_id) else {
                continue;
            };
            let before = node.member_ids.len();
            if node.is_role() {
                node.member_ids.retain(|id| member_ids.contains(id));
            } else {
                node.member_ids.clear();
            }
            repaired += before - node.member_ids.len();
        }

        for member in &mut self.members {
            let before = member.assignments.len();
            let tree = &self.tree;
            member
                .assignments
                .retain(|role_id| tree.find_node(*role_id).is_some_and(|n| n.is_role()));
            repaired += before - member.assignments.len();
        }

        for index in 0..self.members.len() {
            let member_id = self.members[index].id;
            let roles: Vec<NodeId> = self.members[index].assignments.iter().copied().collect();
            for role_id in roles {
                if let Some(role) = self.tree.node_mut(role_id) {
                    if role.member_ids.insert(member_id) {
                        repaired += 1;
                    }
                }
            }
        }

        for node_id in self.tree.preorder() {
            let holders: Vec<MemberId> = self
                .tree
                .find_node(node_id)
                .map(|node| node.member_ids.iter().copied().collect())
                .unwrap_or_default();
            for member in self
                .members
                .iter_mut()
                .filter(|member| holders.contains(&member.id))
            {
                if member.assignments.insert(node_id) {
                    repaired += 1;
                }
            }
        }
        repaired
    }
}
