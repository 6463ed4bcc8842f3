//! Inference input: pairwise distance edges between profiles.

use super::dataset::DatasetKey;
use super::project::ProjectId;
use super::validation::{validate_identifier, ValidationError};
use serde::{Deserialize, Serialize};

/// Identifies one inference run over one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InferenceKey {
    pub project_id: ProjectId,
    pub dataset_id: String,
    pub id: String,
}

impl InferenceKey {
    pub fn new(project_id: ProjectId, dataset_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            project_id,
            dataset_id: dataset_id.into(),
            id: id.into(),
        }
    }

    pub fn dataset(&self) -> DatasetKey {
        DatasetKey::new(self.project_id, self.dataset_id.clone())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("inference", &self.id)
    }
}

/// Directed edge `from → to` labelled with a distance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistanceEdge {
    pub from: String,
    pub to: String,
    pub distance: i64,
}

impl DistanceEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, distance: i64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            distance,
        }
    }
}
