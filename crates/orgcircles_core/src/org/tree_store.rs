//! Tree Store operations.
//!
//! # Responsibility
//! - Insert, edit, move, merge and delete circles and role leaves.
//! - Seed template instances when a circle gains its first child.
//!
//! # Invariants
//! - Every check runs before the first mutation, so a rejected call leaves
//!   the model untouched.
//! - A node can never be moved into itself or its own subtree.
//! - Deleting a subtree releases every assignment held by its role leaves.
//! - Template instances are never edited, moved or deleted one by one, so a
//!   non-empty circle keeps one instance per template.

use crate::error::{NameField, OrgError, OrgResult};
use crate::model::{NodeId, OrgNode, TemplateId};
use crate::org::{normalize_name, Organization};

/// What `edit_role` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleEditOutcome {
    /// Fields changed in place.
    Updated,
    /// Fields changed and the role now lives under a new parent.
    Moved,
    /// The destination already had a same-named role leaf; assignments were
    /// transferred onto it and the edited role was removed.
    Merged { into: NodeId },
}

impl Organization {
    /// Appends a new circle under `parent_id`, seeded with one instance per template.
    pub fn insert_circle(
        &mut self,
        parent_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
    ) -> OrgResult<NodeId> {
        let name = normalize_name(name, NameField::Circle)?;
        self.require_circle_parent(parent_id)?;

        let id = self.next_id();
        let parent_was_empty = !self.tree.has_children(parent_id);
        self.tree.attach(
            parent_id,
            OrgNode::circle(id, name, description.trim(), driver.trim()),
        )?;
        self.seed_template_instances(id)?;
        if parent_was_empty {
            self.seed_template_instances(parent_id)?;
        }
        Ok(id)
    }

    /// Appends a plain role leaf under `parent_id`.
    pub fn insert_role(
        &mut self,
        parent_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
    ) -> OrgResult<NodeId> {
        let name = normalize_name(name, NameField::Role)?;
        self.require_circle_parent(parent_id)?;

        let id = self.next_id();
        let parent_was_empty = !self.tree.has_children(parent_id);
        self.tree.attach(
            parent_id,
            OrgNode::role(id, name, description.trim(), driver.trim()),
        )?;
        if parent_was_empty {
            self.seed_template_instances(parent_id)?;
        }
        Ok(id)
    }

    /// Appends an instance of `template_id` under `parent_id`.
    pub fn insert_role_from_template(
        &mut self,
        parent_id: NodeId,
        template_id: TemplateId,
    ) -> OrgResult<NodeId> {
        let template = self
            .template(template_id)
            .cloned()
            .ok_or(OrgError::TemplateNotFound(template_id))?;
        self.require_circle_parent(parent_id)?;
        if self.circle_holds_template(parent_id, template_id) {
            return Err(OrgError::TemplateAlreadyInstantiated {
                circle_id: parent_id,
                template_id,
            });
        }

        let id = self.next_id();
        let parent_was_empty = !self.tree.has_children(parent_id);
        self.tree
            .attach(parent_id, OrgNode::template_instance(id, &template))?;
        if parent_was_empty {
            self.seed_template_instances(parent_id)?;
        }
        Ok(id)
    }

    /// Updates a circle and optionally moves it under `new_parent_id`.
    pub fn edit_circle(
        &mut self,
        node_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
        new_parent_id: Option<NodeId>,
    ) -> OrgResult<()> {
        let name = normalize_name(name, NameField::Circle)?;
        let node = self
            .tree
            .find_node(node_id)
            .ok_or(OrgError::NodeNotFound(node_id))?;
        if !node.is_circle() {
            return Err(OrgError::NodeMustBeCircle(node_id));
        }
        let destination = self.relocation_target(node_id, new_parent_id)?;

        if let Some(node) = self.tree.node_mut(node_id) {
            node.name = name;
            node.description = description.trim().to_string();
            node.driver = driver.trim().to_string();
        }
        if let Some(parent_id) = destination {
            self.move_under(node_id, parent_id)?;
        }
        Ok(())
    }

    /// Updates a plain role and optionally moves it, merging on a name clash.
    ///
    /// The merge only happens while relocating: if the destination already
    /// holds a role leaf whose name matches `name` case-insensitively, the
    /// edited role's members are transferred there and the edited role is
    /// removed instead of inserted. Template instances are rejected with
    /// [`OrgError::TemplateInstanceManaged`].
    pub fn edit_role(
        &mut self,
        node_id: NodeId,
        name: &str,
        description: &str,
        driver: &str,
        new_parent_id: Option<NodeId>,
    ) -> OrgResult<RoleEditOutcome> {
        let name = normalize_name(name, NameField::Role)?;
        let node = self
            .tree
            .find_node(node_id)
            .ok_or(OrgError::NodeNotFound(node_id))?;
        if !node.is_role() {
            return Err(OrgError::NodeMustBeRole(node_id));
        }
        if node.template_id.is_some() {
            return Err(OrgError::TemplateInstanceManaged(node_id));
        }
        if self.tree.parent(node_id).is_none() {
            return Err(OrgError::RoleHasNoParent(node_id));
        }
        let destination = self.relocation_target(node_id, new_parent_id)?;

        let merge_target = destination.and_then(|parent_id| {
            self.tree.children(parent_id).iter().copied().find(|child| {
                *child != node_id
                    && self
                        .tree
                        .find_node(*child)
                        .is_some_and(|candidate| candidate.is_role() && candidate.name_matches(&name))
            })
        });
        if let Some(target_id) = merge_target {
            self.merge_role_into(node_id, target_id)?;
            return Ok(RoleEditOutcome::Merged { into: target_id });
        }

        if let Some(node) = self.tree.node_mut(node_id) {
            node.name = name;
            node.description = description.trim().to_string();
            node.driver = driver.trim().to_string();
        }
        match destination {
            Some(parent_id) => {
                self.move_under(node_id, parent_id)?;
                Ok(RoleEditOutcome::Moved)
            }
            None => Ok(RoleEditOutcome::Updated),
        }
    }

    /// Removes a non-root circle and its whole subtree.
    ///
    /// Returns how many nodes were removed.
    pub fn delete_circle(&mut self, node_id: NodeId) -> OrgResult<usize> {
        if node_id == self.tree.root_id() {
            return Err(OrgError::CannotDeleteRoot(node_id));
        }
        let node = self
            .tree
            .find_node(node_id)
            .ok_or(OrgError::NodeNotFound(node_id))?;
        if !node.is_circle() {
            return Err(OrgError::NodeMustBeCircle(node_id));
        }

        for role_id in self.tree.role_leaves(node_id) {
            self.release_all_for_role(role_id);
        }
        Ok(self.tree.remove_subtree(node_id)?.len())
    }

    /// Removes one plain role leaf after releasing its assignments.
    ///
    /// Template instances leave the tree only through `delete_template`.
    pub fn delete_role(&mut self, node_id: NodeId) -> OrgResult<()> {
        let node = self
            .tree
            .find_node(node_id)
            .ok_or(OrgError::NodeNotFound(node_id))?;
        if !node.is_role() {
            return Err(OrgError::NodeMustBeRole(node_id));
        }
        if node.template_id.is_some() {
            return Err(OrgError::TemplateInstanceManaged(node_id));
        }
        if self.tree.parent(node_id).is_none() {
            return Err(OrgError::RoleHasNoParent(node_id));
        }

        self.release_all_for_role(node_id);
        self.tree.remove_subtree(node_id)?;
        Ok(())
    }

    fn require_circle_parent(&self, parent_id: NodeId) -> OrgResult<()> {
        match self.tree.find_node(parent_id) {
            None => Err(OrgError::ParentNotFound(parent_id)),
            Some(parent) if !parent.is_circle() => Err(OrgError::ParentMustBeCircle(parent_id)),
            Some(_) => Ok(()),
        }
    }

    /// Validates a requested new parent and returns it only when it differs
    /// from the current one.
    fn relocation_target(
        &self,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
    ) -> OrgResult<Option<NodeId>> {
        let Some(parent_id) = new_parent_id else {
            return Ok(None);
        };
        if parent_id == node_id {
            return Err(OrgError::CycleDetected { node_id, parent_id });
        }
        self.require_circle_parent(parent_id)?;
        if self.tree.is_descendant(node_id, parent_id) {
            return Err(OrgError::CycleDetected { node_id, parent_id });
        }
        if self.tree.parent(node_id) == Some(parent_id) {
            return Ok(None);
        }
        Ok(Some(parent_id))
    }

    fn move_under(&mut self, node_id: NodeId, parent_id: NodeId) -> OrgResult<()> {
        let parent_was_empty = !self.tree.has_children(parent_id);
        self.tree.reparent(node_id, parent_id)?;
        if parent_was_empty {
            self.seed_template_instances(parent_id)?;
        }
        Ok(())
    }

    fn merge_role_into(&mut self, source_id: NodeId, target_id: NodeId) -> OrgResult<()> {
        let moved_members = self
            .tree
            .node_mut(source_id)
            .map(|source| std::mem::take(&mut source.member_ids))
            .unwrap_or_default();
        if let Some(target) = self.tree.node_mut(target_id) {
            target.member_ids.extend(moved_members.iter().copied());
        }
        for member in self
            .members
            .iter_mut()
            .filter(|member| moved_members.contains(&member.id))
        {
            member.assignments.remove(&source_id);
            member.assignments.insert(target_id);
        }
        self.tree.remove_subtree(source_id)?;
        Ok(())
    }

    /// Returns whether a direct child of `circle_id` instantiates `template_id`.
    pub fn circle_holds_template(&self, circle_id: NodeId, template_id: TemplateId) -> bool {
        self.tree.children(circle_id).iter().any(|child| {
            self.tree
                .find_node(*child)
                .is_some_and(|node| node.instantiates(template_id))
        })
    }
}
