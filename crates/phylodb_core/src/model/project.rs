//! Project: the owner of datasets and of project-private alleles.

use super::validation::ValidationError;
use super::version::Versioned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable project identifier.
pub type ProjectId = Uuid;

/// Who may read a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub version: i64,
    pub deprecated: bool,
    pub name: String,
    pub visibility: Visibility,
    pub description: Option<String>,
}

impl Project {
    /// Creates a new public project with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            version: 1,
            deprecated: false,
            name: name.into(),
            visibility: Visibility::Public,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankField("project name"));
        }
        Ok(())
    }
}

impl Versioned for Project {
    type Key = ProjectId;

    fn key(&self) -> ProjectId {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    fn set_deprecated(&mut self, deprecated: bool) {
        self.deprecated = deprecated;
    }
}
