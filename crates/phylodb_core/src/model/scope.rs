//! Ownership scope for entities that may be private to one project.

use super::project::ProjectId;
use serde::{Deserialize, Serialize};

/// Whether an entity is globally shared or owned by one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "project_id")]
pub enum Scope {
    #[default]
    Global,
    Project(ProjectId),
}

impl Scope {
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Self::Global => None,
            Self::Project(id) => Some(*id),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl From<Option<ProjectId>> for Scope {
    fn from(value: Option<ProjectId>) -> Self {
        value.map_or(Self::Global, Self::Project)
    }
}
