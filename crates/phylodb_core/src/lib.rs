//! Core domain logic for phylodb.
//! Versioned typing-data storage, bulk merge, tree reconstruction and
//! stored layouts.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod visualization;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::{
    Allele, AlleleCall, AlleleKey, Coordinate, Dataset, DatasetKey, DistanceEdge, InferenceKey,
    Locus, LocusKey, Profile, ProfileKey, Project, ProjectId, Scope, Taxon, ValidationError,
    VersionSelector, Versioned, VersionedRef, Visibility, Visualization, VisualizationKey,
    CURRENT_VERSION,
};
pub use repo::{
    any_missing, PageError, PageRequest, RepoError, RepoResult, VersionedRepository,
};
pub use service::{
    ConflictPolicy, MergeEngine, MergeReport, PhylogenyService, ServiceError, ServiceResult,
    TypingService, VisualizationService,
};
pub use visualization::{build_tree, Tree, TreeBuilder, TreeError, Vertex};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
