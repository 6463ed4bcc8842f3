//! Dataset: a project-owned collection of typing profiles over one taxon.

use super::project::ProjectId;
use super::validation::{validate_identifier, ValidationError};
use super::version::Versioned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetKey {
    pub project_id: ProjectId,
    pub id: String,
}

impl DatasetKey {
    pub fn new(project_id: ProjectId, id: impl Into<String>) -> Self {
        Self {
            project_id,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub key: DatasetKey,
    pub version: i64,
    pub deprecated: bool,
    /// Taxon whose loci the profiles of this dataset are typed against.
    pub taxon_id: String,
    pub description: Option<String>,
}

impl Dataset {
    pub fn new(key: DatasetKey, taxon_id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            key,
            version: 1,
            deprecated: false,
            taxon_id: taxon_id.into(),
            description,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("dataset", &self.key.id)?;
        validate_identifier("taxon", &self.taxon_id)
    }
}

impl Versioned for Dataset {
    type Key = DatasetKey;

    fn key(&self) -> DatasetKey {
        self.key.clone()
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
