//! Member record.

use crate::model::id::{MemberId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A person that can hold zero or more role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Role-leaf ids this member currently holds.
    ///
    /// Mirrors `OrgNode::member_ids` on the other side of the relation.
    #[serde(default)]
    pub assignments: BTreeSet<NodeId>,
}

impl Member {
    pub fn new(id: MemberId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            assignments: BTreeSet::new(),
        }
    }

    /// Returns whether the member holds `role_id`.
    pub fn holds(&self, role_id: NodeId) -> bool {
        self.assignments.contains(&role_id)
    }
}
