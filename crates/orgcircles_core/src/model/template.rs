//! Role template record.

use crate::model::id::TemplateId;
use serde::{Deserialize, Serialize};

/// Named role definition instantiated into every eligible circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    /// Unique among templates, compared case-insensitively.
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Template {
    pub fn new(id: TemplateId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Case-insensitive name comparison used for uniqueness checks.
    pub fn name_matches(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.trim().to_lowercase()
    }
}
