//! Serializable snapshot of the whole organization model.
//!
//! # Responsibility
//! - Define the document saved after every successful mutation.
//! - Provide the default single-root model used when nothing loads.
//!
//! # Invariants
//! - A snapshot is plain data; structural validation happens when it is
//!   turned back into an `Organization`.

use crate::model::id::NodeId;
use crate::model::member::Member;
use crate::model::node::{NodeKind, OrganizationNode};
use crate::model::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current snapshot document version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const DEFAULT_ROOT_NAME: &str = "Company";
const DEFAULT_ROOT_DESCRIPTION: &str = "Organizational structure visualization";

/// Complete persisted model state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub tree: OrganizationNode,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl Snapshot {
    /// Default model: one root circle, no members, no templates.
    pub fn with_default_root(root_id: NodeId) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            tree: OrganizationNode {
                id: root_id,
                kind: NodeKind::Circle,
                name: DEFAULT_ROOT_NAME.to_string(),
                description: DEFAULT_ROOT_DESCRIPTION.to_string(),
                driver: String::new(),
                children: Vec::new(),
                member_ids: BTreeSet::new(),
                template_id: None,
            },
            members: Vec::new(),
            templates: Vec::new(),
        }
    }

    /// Encodes the snapshot as a JSON document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a snapshot from a JSON document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}
