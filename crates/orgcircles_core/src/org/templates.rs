//! Template Registry operations.
//!
//! # Responsibility
//! - Own the template catalog.
//! - Keep template instances synchronized across the whole tree.
//!
//! # Invariants
//! - Template names are unique case-insensitively.
//! - Every circle with at least one child holds exactly one instance of each
//!   template after `create_template`; none remain after `delete_template`.

use crate::error::{NameField, OrgError, OrgResult};
use crate::model::{NodeId, OrgNode, Template, TemplateId};
use crate::org::{normalize_name, Organization};

impl Organization {
    /// Adds a template and instantiates it in every non-empty circle.
    pub fn create_template(&mut self, name: &str, description: &str) -> OrgResult<Template> {
        let name = normalize_name(name, NameField::Template)?;
        self.require_unique_template_name(&name, None)?;

        let template = Template::new(self.next_id(), name, description.trim());
        self.templates.push(template.clone());
        let eligible: Vec<NodeId> = self
            .tree
            .circles()
            .into_iter()
            .filter(|circle_id| self.tree.has_children(*circle_id))
            .collect();
        for circle_id in eligible {
            let id = self.next_id();
            self.tree
                .attach(circle_id, OrgNode::template_instance(id, &template))?;
        }
        Ok(template)
    }

    /// Renames/re-describes a template and every instance of it in place.
    ///
    /// Returns how many instances were updated.
    pub fn edit_template(
        &mut self,
        template_id: TemplateId,
        name: &str,
        description: &str,
    ) -> OrgResult<usize> {
        let name = normalize_name(name, NameField::Template)?;
        if self.template(template_id).is_none() {
            return Err(OrgError::TemplateNotFound(template_id));
        }
        self.require_unique_template_name(&name, Some(template_id))?;

        let description = description.trim().to_string();
        if let Some(template) = self.templates.iter_mut().find(|t| t.id == template_id) {
            template.name = name.clone();
            template.description = description.clone();
        }
        let mut updated = 0;
        for node_id in self.instances_of(template_id) {
            if let Some(node) = self.tree.node_mut(node_id) {
                node.name = name.clone();
                node.description = description.clone();
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Removes a template and strips its instances tree-wide.
    ///
    /// Assignments held by removed instances are released first. Returns how
    /// many instances were removed.
    pub fn delete_template(&mut self, template_id: TemplateId) -> OrgResult<usize> {
        if self.template(template_id).is_none() {
            return Err(OrgError::TemplateNotFound(template_id));
        }

        let instances = self.instances_of(template_id);
        for node_id in &instances {
            self.release_all_for_role(*node_id);
            self.tree.remove_subtree(*node_id)?;
        }
        self.templates.retain(|template| template.id != template_id);
        Ok(instances.len())
    }

    /// Ids of every instance of `template_id`, in pre-order.
    pub fn instances_of(&self, template_id: TemplateId) -> Vec<NodeId> {
        self.tree
            .preorder()
            .into_iter()
            .filter(|id| {
                self.tree
                    .find_node(*id)
                    .is_some_and(|node| node.instantiates(template_id))
            })
            .collect()
    }

    /// Appends instances for every template `circle_id` does not hold yet.
    pub(crate) fn seed_template_instances(&mut self, circle_id: NodeId) -> OrgResult<usize> {
        let missing: Vec<Template> = self
            .templates
            .iter()
            .filter(|template| !self.circle_holds_template(circle_id, template.id))
            .cloned()
            .collect();
        for template in &missing {
            let id = self.next_id();
            self.tree
                .attach(circle_id, OrgNode::template_instance(id, template))?;
        }
        Ok(missing.len())
    }

    fn require_unique_template_name(
        &self,
        name: &str,
        except: Option<TemplateId>,
    ) -> OrgResult<()> {
        let clash = self
            .templates
            .iter()
            .any(|template| Some(template.id) != except && template.name_matches(name));
        if clash {
            return Err(OrgError::DuplicateTemplateName(name.to_string()));
        }
        Ok(())
    }
}
