//! Allele: one observed sequence variant of a locus.
//!
//! # Invariants
//! - A global allele and a project-scoped allele with the same ids are two
//!   different entities with independent histories.
//! - `sequence = None` (or blank) marks a placeholder with no payload yet.

use super::locus::LocusKey;
use super::scope::Scope;
use super::validation::{is_blank, validate_identifier, validate_sequence, ValidationError};
use super::version::Versioned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlleleKey {
    pub taxon_id: String,
    pub locus_id: String,
    pub id: String,
    pub scope: Scope,
}

impl AlleleKey {
    pub fn new(
        taxon_id: impl Into<String>,
        locus_id: impl Into<String>,
        id: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            locus_id: locus_id.into(),
            id: id.into(),
            scope,
        }
    }

    pub fn locus(&self) -> LocusKey {
        LocusKey::new(self.taxon_id.clone(), self.locus_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allele {
    pub key: AlleleKey,
    pub version: i64,
    pub deprecated: bool,
    pub sequence: Option<String>,
}

impl Allele {
    pub fn new(key: AlleleKey, sequence: Option<String>) -> Self {
        Self {
            key,
            version: 1,
            deprecated: false,
            sequence,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("taxon", &self.key.taxon_id)?;
        validate_identifier("locus", &self.key.locus_id)?;
        validate_identifier("allele", &self.key.id)?;
        if let Some(sequence) = self.sequence.as_deref() {
            validate_sequence(sequence)?;
        }
        Ok(())
    }

    pub fn has_sequence(&self) -> bool {
        !is_blank(self.sequence.as_deref())
    }
}

impl Versioned for Allele {
    type Key = AlleleKey;

    fn key(&self) -> AlleleKey {
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
