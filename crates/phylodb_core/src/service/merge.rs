//! Bulk import: reconciles a batch against current store state.
//!
//! # Responsibility
//! - Classify each incoming record as new, unchanged, fill-in or conflict.
//! - Apply the caller's conflict policy and write through the repository.
//!
//! # Invariants
//! - Unchanged records are never rewritten, so re-importing a batch is a
//!   no-op.
//! - A stored placeholder (no payload) is always filled in.
//! - The whole batch runs in one transaction.

use crate::model::{Allele, Dataset, Locus, Profile, Project, Taxon, Versioned};
use crate::model::validation::is_blank;
use crate::repo::{in_write_transaction, RepoResult, VersionedRepository};
use log::info;

/// What to do when an incoming payload differs from a non-empty stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Keep the stored revision.
    #[default]
    Skip,
    /// Append the incoming payload as a new revision.
    Update,
}

/// Classification of one incoming record against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeClass {
    /// No live current revision exists. Covers keys never stored (written at
    /// version 1) and deleted keys, which keep their history and are
    /// appended at max+1 rather than re-created at version 1.
    New,
    /// Same payload as the current revision.
    Unchanged,
    /// Current revision is a placeholder and the incoming payload differs.
    FillIn,
    /// Both payloads are non-empty and differ.
    Conflict,
}

/// Payload comparison used by the merge engine.
pub trait Mergeable: Versioned {
    /// True when both values carry the same payload. Key, version and
    /// deprecated flag are not compared.
    fn same_payload(&self, other: &Self) -> bool;

    /// True when the value carries no payload yet.
    fn is_placeholder(&self) -> bool;
}

/// Keys per outcome of one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport<K> {
    pub written: Vec<K>,
    /// Conflicts retained under `ConflictPolicy::Skip`.
    pub skipped: Vec<K>,
    pub unchanged: Vec<K>,
    /// Records the repository refused, e.g. under a missing parent.
    pub rejected: Vec<K>,
}

impl<K> Default for MergeReport<K> {
    fn default() -> Self {
        Self {
            written: Vec::new(),
            skipped: Vec::new(),
            unchanged: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<K> MergeReport<K> {
    pub fn wrote_any(&self) -> bool {
        !self.written.is_empty()
    }
}

/// Applies one conflict policy to batches of any entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeEngine {
    policy: ConflictPolicy,
}

impl MergeEngine {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Compares `incoming` with the current revision, if any.
    pub fn classify<E: Mergeable>(current: Option<&E>, incoming: &E) -> MergeClass {
        match current {
            None => MergeClass::New,
            Some(stored) if stored.same_payload(incoming) => MergeClass::Unchanged,
            Some(stored) if stored.is_placeholder() => MergeClass::FillIn,
            Some(_) => MergeClass::Conflict,
        }
    }

    /// Merges `batch` into `repo` in one transaction.
    ///
    /// Records are processed in order, so a later duplicate key sees the
    /// revision written for an earlier one.
    pub fn merge<R>(&self, repo: &R, batch: &[R::Entity]) -> RepoResult<MergeReport<R::Key>>
    where
        R: VersionedRepository,
        R::Entity: Mergeable,
    {
        let mut report = MergeReport::default();
        if batch.is_empty() {
            return Ok(report);
        }

        in_write_transaction(repo.connection(), || {
            for incoming in batch {
                let key = incoming.key();
                let current = repo.find_current(&key)?;
                let write = match Self::classify(current.as_ref(), incoming) {
                    MergeClass::New | MergeClass::FillIn => true,
                    MergeClass::Unchanged => {
                        report.unchanged.push(key);
                        continue;
                    }
                    MergeClass::Conflict => self.policy == ConflictPolicy::Update,
                };
                if !write {
                    report.skipped.push(key);
                } else if repo.save(incoming)? {
                    report.written.push(key);
                } else {
                    report.rejected.push(key);
                }
            }
            Ok(())
        })?;

        info!(
            "event=merge module=service status=ok policy={:?} written={} skipped={} unchanged={} rejected={}",
            self.policy,
            report.written.len(),
            report.skipped.len(),
            report.unchanged.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    /// Boolean form of `merge`: true when anything was written.
    pub fn merge_into<R>(&self, repo: &R, batch: &[R::Entity]) -> RepoResult<bool>
    where
        R: VersionedRepository,
        R::Entity: Mergeable,
    {
        Ok(self.merge(repo, batch)?.wrote_any())
    }
}

impl Mergeable for Project {
    fn same_payload(&self, other: &Self) -> bool {
        self.name == other.name
            && self.visibility == other.visibility
            && self.description == other.description
    }

    fn is_placeholder(&self) -> bool {
        is_blank(self.description.as_deref())
    }
}

impl Mergeable for Taxon {
    fn same_payload(&self, other: &Self) -> bool {
        self.description == other.description
    }

    fn is_placeholder(&self) -> bool {
        is_blank(self.description.as_deref())
    }
}

impl Mergeable for Locus {
    fn same_payload(&self, other: &Self) -> bool {
        self.description == other.description
    }

    fn is_placeholder(&self) -> bool {
        is_blank(self.description.as_deref())
    }
}

impl Mergeable for Allele {
    fn same_payload(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }

    fn is_placeholder(&self) -> bool {
        !self.has_sequence()
    }
}

impl Mergeable for Dataset {
    fn same_payload(&self, other: &Self) -> bool {
        self.taxon_id == other.taxon_id && self.description == other.description
    }

    fn is_placeholder(&self) -> bool {
        is_blank(self.description.as_deref())
    }
}

impl Mergeable for Profile {
    fn same_payload(&self, other: &Self) -> bool {
        self.aka == other.aka && self.alleles == other.alleles
    }

    fn is_placeholder(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{MergeClass, MergeEngine};
    use crate::model::{Allele, AlleleKey, Scope};

    fn allele(sequence: Option<&str>) -> Allele {
        Allele::new(
            AlleleKey::new("t", "l", "1", Scope::Global),
            sequence.map(str::to_string),
        )
    }

    #[test]
    fn classification_covers_every_case() {
        let stored = allele(Some("ACGT"));
        let placeholder = allele(None);

        assert_eq!(MergeEngine::classify(None, &stored), MergeClass::New);
        assert_eq!(
            MergeEngine::classify(Some(&stored), &allele(Some("ACGT"))),
            MergeClass::Unchanged
        );
        assert_eq!(
            MergeEngine::classify(Some(&placeholder), &stored),
            MergeClass::FillIn
        );
        assert_eq!(
            MergeEngine::classify(Some(&stored), &allele(Some("TTTT"))),
            MergeClass::Conflict
        );
        assert_eq!(
            MergeEngine::classify(Some(&placeholder), &allele(None)),
            MergeClass::Unchanged
        );
    }
}
