//! Profile: the allelic typing of one isolate inside a dataset.
//!
//! # Invariants
//! - Allele calls keep the order they were submitted in.
//! - A call marked `private` resolves to the allele owned by the dataset's
//!   project; every other call resolves to the global allele.

use super::allele::AlleleKey;
use super::dataset::DatasetKey;
use super::project::ProjectId;
use super::scope::Scope;
use super::validation::{is_blank, validate_identifier, ValidationError};
use super::version::Versioned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileKey {
    pub project_id: ProjectId,
    pub dataset_id: String,
    pub id: String,
}

impl ProfileKey {
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
}

/// One locus → allele assignment of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlleleCall {
    pub locus_id: String,
    pub allele_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub private: bool,
}

impl AlleleCall {
    pub fn new(locus_id: impl Into<String>, allele_id: impl Into<String>) -> Self {
        Self {
            locus_id: locus_id.into(),
            allele_id: allele_id.into(),
            private: false,
        }
    }

    pub fn private(locus_id: impl Into<String>, allele_id: impl Into<String>) -> Self {
        Self {
            private: true,
            ..Self::new(locus_id, allele_id)
        }
    }

    /// Key of the referenced allele, or `None` when the call is unresolved
    /// (blank locus or allele id).
    pub fn resolve(&self, taxon_id: &str, project_id: ProjectId) -> Option<AlleleKey> {
        if is_blank(Some(&self.locus_id)) || is_blank(Some(&self.allele_id)) {
            return None;
        }
        let scope = if self.private {
            Scope::Project(project_id)
        } else {
            Scope::Global
        };
        Some(AlleleKey::new(
            taxon_id,
            self.locus_id.trim(),
            self.allele_id.trim(),
            scope,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub key: ProfileKey,
    pub version: i64,
    pub deprecated: bool,
    /// Alternative name the isolate is known by.
    pub aka: Option<String>,
    pub alleles: Vec<AlleleCall>,
}

impl Profile {
    pub fn new(key: ProfileKey, aka: Option<String>, alleles: Vec<AlleleCall>) -> Self {
        Self {
            key,
            version: 1,
            deprecated: false,
            aka,
            alleles,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("dataset", &self.key.dataset_id)?;
        validate_identifier("profile", &self.key.id)
    }

    pub fn has_private_alleles(&self) -> bool {
        self.alleles.iter().any(|call| call.private)
    }

    /// True when neither an alias nor any allele call is present.
    pub fn is_empty(&self) -> bool {
        is_blank(self.aka.as_deref()) && self.alleles.is_empty()
    }
}

impl Versioned for Profile {
    type Key = ProfileKey;

    fn key(&self) -> ProfileKey {
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

#[cfg(test)]
mod tests {
    use super::AlleleCall;
    use crate::model::scope::Scope;
    use uuid::Uuid;

    #[test]
    fn private_calls_resolve_under_the_project_scope() {
        let project = Uuid::new_v4();
        let global = AlleleCall::new("adk", "1").resolve("senterica", project).unwrap();
        let private = AlleleCall::private("adk", "1")
            .resolve("senterica", project)
            .unwrap();

        assert_eq!(global.scope, Scope::Global);
        assert_eq!(private.scope, Scope::Project(project));
        assert_eq!(private.locus_id, "adk");
    }

    #[test]
    fn blank_calls_are_unresolved() {
        let project = Uuid::new_v4();
        assert!(AlleleCall::new("adk", " ").resolve("t", project).is_none());
        assert!(AlleleCall::new("", "1").resolve("t", project).is_none());
    }
}
