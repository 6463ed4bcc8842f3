//! Uniform versioned-entity contract shared by every repository.
//!
//! # Invariants
//! - `find_current` never returns a deprecated revision.
//! - `find` with an exact version returns that revision whether or not it
//!   is deprecated.
//! - Listings contain only current, non-deprecated entities, ordered by key.

use super::version_chain::in_write_transaction;
use super::RepoResult;
use crate::model::{VersionSelector, Versioned, VersionedRef};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Validated page window. Offsets are `page * limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

/// Rejected paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    NegativePage(i64),
    NonPositiveLimit(i64),
}

impl Display for PageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativePage(page) => write!(f, "page must not be negative, got {page}"),
            Self::NonPositiveLimit(limit) => write!(f, "limit must be positive, got {limit}"),
        }
    }
}

impl Error for PageError {}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Result<Self, PageError> {
        if page < 0 {
            return Err(PageError::NegativePage(page));
        }
        if limit <= 0 {
            return Err(PageError::NonPositiveLimit(limit));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows to skip; saturates instead of overflowing on absurd pages.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.limit)
    }
}

/// Versioned storage for one entity kind.
///
/// Implementations provide single-revision lookup, one page of current
/// entities and the append-only save. Everything else is derived.
pub trait VersionedRepository {
    type Key: Clone + Debug + PartialEq;
    type Entity: Versioned<Key = Self::Key> + Clone;
    /// Scope narrowing listings, e.g. "loci of one taxon".
    type Filter;

    /// Connection every write of this repository runs on.
    fn connection(&self) -> &Connection;

    fn find(&self, key: &Self::Key, version: VersionSelector) -> RepoResult<Option<Self::Entity>>;

    /// Current, non-deprecated entities under `filter`, ordered by key.
    /// An empty page is `Ok(vec![])`.
    fn find_page(&self, request: PageRequest, filter: &Self::Filter)
        -> RepoResult<Vec<Self::Entity>>;

    /// Appends the next revision of `entity`.
    ///
    /// Returns `Ok(false)` without writing when a required parent is missing
    /// or deprecated. The version carried by `entity` is ignored.
    fn save(&self, entity: &Self::Entity) -> RepoResult<bool>;

    fn find_current(&self, key: &Self::Key) -> RepoResult<Option<Self::Entity>> {
        self.find(key, VersionSelector::Current)
    }

    fn exists(&self, key: &Self::Key) -> RepoResult<bool> {
        Ok(self.find_current(key)?.is_some())
    }

    /// Conflated paging: `None` for invalid paging and for an empty page.
    fn find_all(
        &self,
        page: i64,
        limit: i64,
        filter: &Self::Filter,
    ) -> RepoResult<Option<Vec<Self::Entity>>> {
        let Ok(request) = PageRequest::new(page, limit) else {
            return Ok(None);
        };
        let entities = self.find_page(request, filter)?;
        if entities.is_empty() {
            return Ok(None);
        }
        Ok(Some(entities))
    }

    /// Summary listing with the same paging contract as `find_all`.
    fn find_all_refs(
        &self,
        page: i64,
        limit: i64,
        filter: &Self::Filter,
    ) -> RepoResult<Option<Vec<VersionedRef<Self::Key>>>> {
        Ok(self
            .find_all(page, limit, filter)?
            .map(|entities| entities.iter().map(VersionedRef::of).collect()))
    }

    /// Appends a deprecated copy of the current revision.
    fn remove(&self, key: &Self::Key) -> RepoResult<bool> {
        in_write_transaction(self.connection(), || {
            let Some(mut current) = self.find_current(key)? else {
                return Ok(false);
            };
            current.set_deprecated(true);
            self.save(&current)
        })
    }

    /// Saves every entity in one transaction. True when anything was written.
    fn save_all(&self, entities: &[Self::Entity]) -> RepoResult<bool> {
        if entities.is_empty() {
            return Ok(false);
        }
        in_write_transaction(self.connection(), || {
            let mut wrote_any = false;
            for entity in entities {
                wrote_any |= self.save(entity)?;
            }
            Ok(wrote_any)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PageError, PageRequest};

    #[test]
    fn page_request_rejects_negative_page_and_non_positive_limit() {
        assert_eq!(PageRequest::new(-1, 2), Err(PageError::NegativePage(-1)));
        assert_eq!(PageRequest::new(0, 0), Err(PageError::NonPositiveLimit(0)));
        assert_eq!(PageRequest::new(0, -5), Err(PageError::NonPositiveLimit(-5)));

        let request = PageRequest::new(3, 2).unwrap();
        assert_eq!(request.offset(), 6);
        assert_eq!(request.limit(), 2);
    }

    #[test]
    fn offset_saturates() {
        let request = PageRequest::new(i64::MAX, 10).unwrap();
        assert_eq!(request.offset(), i64::MAX);
    }
}
