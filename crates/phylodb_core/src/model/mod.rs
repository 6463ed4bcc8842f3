//! Typing-data domain model.
//!
//! # Responsibility
//! - Define the versioned entities (projects, taxa, loci, alleles, datasets,
//!   profiles) and their composite keys.
//! - Define the unversioned inference input (distance edges) and the
//!   stored layouts computed from it.
//!
//! # Invariants
//! - `version` is positive and assigned by the store, never by callers.
//! - Deletion is a deprecated revision, never a physical delete.
//! - Identifiers are validated before any write.

pub mod allele;
pub mod dataset;
pub mod inference;
pub mod locus;
pub mod profile;
pub mod project;
pub mod scope;
pub mod taxon;
pub mod validation;
pub mod version;
pub mod visualization;

pub use allele::{Allele, AlleleKey};
pub use dataset::{Dataset, DatasetKey};
pub use inference::{DistanceEdge, InferenceKey};
pub use locus::{Locus, LocusKey};
pub use profile::{AlleleCall, Profile, ProfileKey};
pub use project::{Project, ProjectId, Visibility};
pub use scope::Scope;
pub use taxon::Taxon;
pub use validation::ValidationError;
pub use version::{Versioned, VersionSelector, VersionedRef, CURRENT_VERSION};
pub use visualization::{Coordinate, Visualization, VisualizationKey};
