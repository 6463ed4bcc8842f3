//! Referential-integrity gate run before dependent writes.

use super::versioned::VersionedRepository;
use super::RepoResult;
use crate::model::VersionedRef;
use log::debug;

/// True when any reference is unresolved (`None`) or points at an entity
/// with no live current revision. An empty list has nothing missing.
///
/// Run it inside the transaction of the dependent write so the answer still
/// holds when the write commits.
pub fn any_missing<R>(repo: &R, refs: &[Option<VersionedRef<R::Key>>]) -> RepoResult<bool>
where
    R: VersionedRepository,
{
    for (index, reference) in refs.iter().enumerate() {
        let Some(reference) = reference else {
            debug!("event=integrity_check module=repo status=missing index={index} reason=unresolved");
            return Ok(true);
        };
        if !repo.exists(&reference.key)? {
            debug!(
                "event=integrity_check module=repo status=missing index={index} key={:?}",
                reference.key
            );
            return Ok(true);
        }
    }
    Ok(false)
}
