//! Locus: a typed gene region inside one taxon.

use super::validation::{validate_identifier, ValidationError};
use super::version::Versioned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocusKey {
    pub taxon_id: String,
    pub id: String,
}

impl LocusKey {
    pub fn new(taxon_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locus {
    pub key: LocusKey,
    pub version: i64,
    pub deprecated: bool,
    pub description: Option<String>,
}

impl Locus {
    pub fn new(
        taxon_id: impl Into<String>,
        id: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            key: LocusKey::new(taxon_id, id),
            version: 1,
            deprecated: false,
            description,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("taxon", &self.key.taxon_id)?;
        validate_identifier("locus", &self.key.id)
    }
}

impl Versioned for Locus {
    type Key = LocusKey;

    fn key(&self) -> LocusKey {
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
