//! Stored layouts of an inference run: one 2-D coordinate per profile.

use super::inference::InferenceKey;
use super::project::ProjectId;
use super::validation::{validate_identifier, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifies one visualization of one inference run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualizationKey {
    pub project_id: ProjectId,
    pub dataset_id: String,
    pub inference_id: String,
    pub id: String,
}

impl VisualizationKey {
    pub fn new(
        project_id: ProjectId,
        dataset_id: impl Into<String>,
        inference_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            dataset_id: dataset_id.into(),
            inference_id: inference_id.into(),
            id: id.into(),
        }
    }

    pub fn inference(&self) -> InferenceKey {
        InferenceKey::new(
            self.project_id,
            self.dataset_id.clone(),
            self.inference_id.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub profile_id: String,
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(profile_id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            profile_id: profile_id.into(),
            x,
            y,
        }
    }
}

/// Not versioned: written once, later only deprecated. Reads return live
/// layouts only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub key: VisualizationKey,
    /// Layout algorithm that produced the coordinates, e.g. `radial`.
    pub algorithm: String,
    pub coordinates: Vec<Coordinate>,
}

impl Visualization {
    pub fn new(key: VisualizationKey, algorithm: impl Into<String>, coordinates: Vec<Coordinate>) -> Self {
        Self {
            key,
            algorithm: algorithm.into(),
            coordinates,
        }
    }

    /// Identifiers must be well formed, coordinates finite, and each profile
    /// placed at most once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("visualization", &self.key.id)?;
        validate_identifier("algorithm", &self.algorithm)?;
        let mut placed = HashSet::new();
        for coordinate in &self.coordinates {
            validate_identifier("profile", &coordinate.profile_id)?;
            if !coordinate.x.is_finite() || !coordinate.y.is_finite() {
                return Err(ValidationError::InvalidCoordinate(format!(
                    "`{}` has a non-finite position",
                    coordinate.profile_id
                )));
            }
            if !placed.insert(coordinate.profile_id.as_str()) {
                return Err(ValidationError::InvalidCoordinate(format!(
                    "`{}` is placed twice",
                    coordinate.profile_id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Coordinate, Visualization, VisualizationKey};
    use uuid::Uuid;

    fn key() -> VisualizationKey {
        VisualizationKey::new(Uuid::nil(), "ds", "run1", "layout")
    }

    #[test]
    fn well_formed_layout_validates() {
        let layout = Visualization::new(
            key(),
            "radial",
            vec![Coordinate::new("A", 0.0, 0.0), Coordinate::new("B", 1.5, -2.0)],
        );
        assert!(layout.validate().is_ok());
        assert_eq!(layout.key.inference().id, "run1");
    }

    #[test]
    fn duplicate_or_non_finite_coordinates_are_rejected() {
        let twice = Visualization::new(
            key(),
            "radial",
            vec![Coordinate::new("A", 0.0, 0.0), Coordinate::new("A", 1.0, 1.0)],
        );
        assert!(twice.validate().is_err());

        let nan = Visualization::new(key(), "radial", vec![Coordinate::new("A", f64::NAN, 0.0)]);
        assert!(nan.validate().is_err());
    }
}
