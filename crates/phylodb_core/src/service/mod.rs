//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into per-domain use-case APIs.
//! - Check parent entities explicitly before dependent writes, inside the
//!   same transaction as the write.
//! - Keep an outer transport layer decoupled from storage details.
//!
//! # Invariants
//! - "Nothing there" is `Ok(None)` or `Ok(false)`, never an error.
//! - Errors are reserved for storage failures and malformed data.

use crate::repo::RepoError;
use crate::visualization::TreeError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod merge;
pub mod phylogeny_service;
pub mod typing_service;
pub mod visualization_service;

pub use merge::{ConflictPolicy, MergeClass, MergeEngine, MergeReport, Mergeable};
pub use phylogeny_service::PhylogenyService;
pub use typing_service::TypingService;
pub use visualization_service::VisualizationService;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for typing-data use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Stored edges do not form a forest.
    Tree(TreeError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Tree(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<TreeError> for ServiceError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}
