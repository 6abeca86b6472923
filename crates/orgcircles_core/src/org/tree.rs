//! Organization tree arena.
//!
//! # Responsibility
//! - Own every node record together with explicit parent/child links.
//! - Answer structural queries (lookup, ancestry, traversal) in O(1)/O(depth).
//! - Convert between the arena and the nested snapshot shape.
//!
//! # Invariants
//! - Exactly one root, which is a circle and has no parent.
//! - `parent` links always agree with the `children` lists.
//! - Only circles have children.
//! - Structural mutation is crate-private; callers go through Tree Store
//!   operations on `Organization`.

use crate::error::{OrgError, OrgResult};
use crate::model::{NodeId, NodeKind, OrgNode, OrganizationNode};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reasons a nested tree cannot be loaded into the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeShapeError {
    /// The root node is not a circle.
    RootMustBeCircle(NodeId),
    /// The same id appears more than once.
    DuplicateNodeId(NodeId),
    /// A role leaf lists children.
    LeafHasChildren(NodeId),
    /// A template instance is missing its template reference, or a
    /// non-instance carries one.
    TemplateLinkMismatch(NodeId),
    /// A circle lists member ids.
    CircleHasMembers(NodeId),
}

impl Display for TreeShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootMustBeCircle(id) => write!(f, "root node must be a circle: {id}"),
            Self::DuplicateNodeId(id) => write!(f, "duplicate node id: {id}"),
            Self::LeafHasChildren(id) => write!(f, "role leaf has children: {id}"),
            Self::TemplateLinkMismatch(id) => {
                write!(f, "template link does not match node kind: {id}")
            }
            Self::CircleHasMembers(id) => write!(f, "circle lists member ids: {id}"),
        }
    }
}

impl Error for TreeShapeError {}

#[derive(Debug, Clone)]
struct NodeEntry {
    node: OrgNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena of organization nodes keyed by id.
#[derive(Debug, Clone)]
pub struct OrgTree {
    root: NodeId,
    entries: HashMap<NodeId, NodeEntry>,
}

impl OrgTree {
    /// Creates a tree holding only `root`, which is coerced to a circle.
    pub fn new(mut root: OrgNode) -> Self {
        root.kind = NodeKind::Circle;
        root.template_id = None;
        root.member_ids.clear();
        let root_id = root.id;
        let mut entries = HashMap::new();
        entries.insert(
            root_id,
            NodeEntry {
                node: root,
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            root: root_id,
            entries,
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &OrgNode {
        // Root entry is inserted on construction and never removed.
        &self.entries[&self.root].node
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Looks up one node by id.
    pub fn find_node(&self, id: NodeId) -> Option<&OrgNode> {
        self.entries.get(&id).map(|entry| &entry.node)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(&id).and_then(|entry| entry.parent)
    }

    /// Children in stored (insertion) order; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entries
            .get(&id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.contains(id).then(|| self.ancestors(id).len())
    }

    /// Ancestors of `id`, nearest first, ending at the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            if result.len() >= self.entries.len() {
                break;
            }
            result.push(current);
            cursor = self.parent(current);
        }
        result
    }

    /// Returns whether `node` lies strictly inside `ancestor_candidate`'s subtree.
    pub fn is_descendant(&self, ancestor_candidate: NodeId, node: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor_candidate {
                return true;
            }
            if !visited.insert(current) {
                return false;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Pre-order ids of `id`'s subtree, `id` first; empty for unknown ids.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Pre-order ids of the whole tree.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// Circles of the whole tree in pre-order.
    pub fn circles(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.find_node(*id).is_some_and(OrgNode::is_circle))
            .collect()
    }

    /// Role leaves of `id`'s subtree in pre-order.
    pub fn role_leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node_id| self.find_node(*node_id).is_some_and(OrgNode::is_role))
            .collect()
    }

    /// Rebuilds the nested snapshot shape.
    pub fn to_nested(&self) -> OrganizationNode {
        self.nested_from(self.root)
    }

    fn nested_from(&self, id: NodeId) -> OrganizationNode {
        let entry = &self.entries[&id];
        let mut nested = OrganizationNode::from_record(&entry.node);
        nested.children = entry
            .children
            .iter()
            .map(|child| self.nested_from(*child))
            .collect();
        nested
    }

    /// Loads a nested tree, rejecting shapes that break tree invariants.
    pub fn from_nested(root: &OrganizationNode) -> Result<Self, TreeShapeError> {
        if root.kind != NodeKind::Circle {
            return Err(TreeShapeError::RootMustBeCircle(root.id));
        }

        let mut tree = Self {
            root: root.id,
            entries: HashMap::with_capacity(root.subtree_len()),
        };
        let mut stack: Vec<(&OrganizationNode, Option<NodeId>)> = vec![(root, None)];
        while let Some((nested, parent)) = stack.pop() {
            validate_nested_node(nested)?;
            if tree.entries.contains_key(&nested.id) {
                return Err(TreeShapeError::DuplicateNodeId(nested.id));
            }
            tree.entries.insert(
                nested.id,
                NodeEntry {
                    node: nested.to_record(),
                    parent,
                    children: nested.children.iter().map(|child| child.id).collect(),
                },
            );
            for child in nested.children.iter().rev() {
                stack.push((child, Some(nested.id)));
            }
        }
        Ok(tree)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut OrgNode> {
        self.entries.get_mut(&id).map(|entry| &mut entry.node)
    }

    /// Appends `node` as the last child of `parent_id`.
    pub(crate) fn attach(&mut self, parent_id: NodeId, node: OrgNode) -> OrgResult<NodeId> {
        let parent = self
            .entries
            .get_mut(&parent_id)
            .ok_or(OrgError::ParentNotFound(parent_id))?;
        if !parent.node.is_circle() {
            return Err(OrgError::ParentMustBeCircle(parent_id));
        }
        let id = node.id;
        parent.children.push(id);
        self.entries.insert(
            id,
            NodeEntry {
                node,
                parent: Some(parent_id),
                children: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Moves `id` to the end of `new_parent_id`'s children.
    pub(crate) fn reparent(&mut self, id: NodeId, new_parent_id: NodeId) -> OrgResult<()> {
        if !self.contains(new_parent_id) {
            return Err(OrgError::ParentNotFound(new_parent_id));
        }
        self.unlink_from_parent(id)?;
        if let Some(parent) = self.entries.get_mut(&new_parent_id) {
            parent.children.push(id);
        }
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.parent = Some(new_parent_id);
        }
        Ok(())
    }

    /// Detaches `id` from its parent and drops its whole subtree.
    ///
    /// Returns the removed records in pre-order.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> OrgResult<Vec<OrgNode>> {
        if id == self.root {
            return Err(OrgError::CannotDeleteRoot(id));
        }
        let doomed = self.descendants(id);
        if doomed.is_empty() {
            return Err(OrgError::NodeNotFound(id));
        }
        self.unlink_from_parent(id)?;
        Ok(doomed
            .into_iter()
            .filter_map(|node_id| self.entries.remove(&node_id))
            .map(|entry| entry.node)
            .collect())
    }

    fn unlink_from_parent(&mut self, id: NodeId) -> OrgResult<()> {
        let parent_id = self
            .entries
            .get(&id)
            .ok_or(OrgError::NodeNotFound(id))?
            .parent
            .ok_or(OrgError::RoleHasNoParent(id))?;
        if let Some(parent) = self.entries.get_mut(&parent_id) {
            parent.children.retain(|child| *child != id);
        }
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.parent = None;
        }
        Ok(())
    }

    /// Structural consistency check used by `Organization::check_invariants`.
    pub(crate) fn structural_violation(&self) -> Option<String> {
        let root = self.entries.get(&self.root)?;
        if root.parent.is_some() || !root.node.is_circle() {
            return Some(format!("root {} must be a parentless circle", self.root));
        }
        for (id, entry) in &self.entries {
            if *id != entry.node.id {
                return Some(format!("entry key {id} does not match node id"));
            }
            if !entry.node.is_circle() && !entry.children.is_empty() {
                return Some(format!("role leaf {id} has children"));
            }
            for child in &entry.children {
                match self.entries.get(child) {
                    Some(child_entry) if child_entry.parent == Some(*id) => {}
                    _ => return Some(format!("child {child} of {id} has inconsistent parent")),
                }
            }
            if let Some(parent_id) = entry.parent {
                let listed = self
                    .entries
                    .get(&parent_id)
                    .is_some_and(|parent| parent.children.contains(id));
                if !listed {
                    return Some(format!("node {id} is not listed by parent {parent_id}"));
                }
            } else if *id != self.root {
                return Some(format!("non-root node {id} has no parent"));
            }
        }
        let reachable = self.preorder();
        let unique: HashSet<NodeId> = reachable.iter().copied().collect();
        if reachable.len() != self.entries.len() || unique.len() != reachable.len() {
            return Some("tree contains unreachable or repeated nodes".to_string());
        }
        None
    }
}

fn validate_nested_node(nested: &OrganizationNode) -> Result<(), TreeShapeError> {
    if nested.kind.is_role() && !nested.children.is_empty() {
        return Err(TreeShapeError::LeafHasChildren(nested.id));
    }
    let is_instance = nested.kind == NodeKind::TemplateInstance;
    if is_instance != nested.template_id.is_some() {
        return Err(TreeShapeError::TemplateLinkMismatch(nested.id));
    }
    if nested.kind == NodeKind::Circle && !nested.member_ids.is_empty() {
        return Err(TreeShapeError::CircleHasMembers(nested.id));
    }
    Ok(())
}
