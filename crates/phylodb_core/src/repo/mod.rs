//! Repository layer: versioned persistence for every typing entity.
//!
//! # Responsibility
//! - Define the uniform versioned-entity contract (`VersionedRepository`).
//! - Keep SQLite query details behind one implementation per entity kind.
//! - Share the version-chain mechanics instead of re-implementing them per kind.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Every write appends a revision; no revision is ever updated in place
//!   except for closing its `to_ms` exactly once.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod allele_repo;
pub mod dataset_repo;
pub mod inference_repo;
pub mod integrity;
pub mod locus_repo;
pub mod profile_repo;
pub mod project_repo;
pub mod taxon_repo;
pub mod version_chain;
pub mod versioned;
pub mod visualization_repo;

pub use allele_repo::{AlleleFilter, SqliteAlleleRepository};
pub use dataset_repo::{DatasetFilter, SqliteDatasetRepository};
pub use inference_repo::SqliteInferenceRepository;
pub use integrity::any_missing;
pub use locus_repo::{LocusFilter, SqliteLocusRepository};
pub use profile_repo::{ProfileFilter, SqliteProfileRepository};
pub use project_repo::SqliteProjectRepository;
pub use taxon_repo::SqliteTaxonRepository;
pub use version_chain::in_write_transaction;
pub use versioned::{PageError, PageRequest, VersionedRepository};
pub use visualization_repo::SqliteVisualizationRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for versioned persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    InvalidData(String),
    /// The version chain did not end in the expected state after a write.
    VersionConflict {
        kind: &'static str,
        expected: i64,
        found: i64,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::VersionConflict {
                kind,
                expected,
                found,
            } => write!(
                f,
                "{kind} version chain conflict: expected version {expected}, found {found}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::VersionConflict { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
