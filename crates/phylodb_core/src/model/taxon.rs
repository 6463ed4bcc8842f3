//! Taxon: root of the locus/allele hierarchy.

use super::validation::{validate_identifier, ValidationError};
use super::version::Versioned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    pub id: String,
    pub version: i64,
    pub deprecated: bool,
    pub description: Option<String>,
}

impl Taxon {
    pub fn new(id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            version: 1,
            deprecated: false,
            description,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("taxon", &self.id)
    }
}

impl Versioned for Taxon {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
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
