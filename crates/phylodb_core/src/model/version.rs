//! Revision addressing shared by all versioned entities.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Raw sentinel for "the current revision" in external version parameters.
pub const CURRENT_VERSION: i64 = -1;

/// Which revision of an entity a lookup resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSelector {
    /// The open, non-deprecated revision.
    #[default]
    Current,
    /// One exact revision, deprecated or not. Non-positive values never match.
    Exact(i64),
}

impl VersionSelector {
    /// Maps a raw version parameter: `CURRENT_VERSION` means current,
    /// anything else is an exact revision number.
    pub fn from_raw(value: i64) -> Self {
        if value == CURRENT_VERSION {
            Self::Current
        } else {
            Self::Exact(value)
        }
    }
}

impl From<i64> for VersionSelector {
    fn from(value: i64) -> Self {
        Self::from_raw(value)
    }
}

/// Common accessors over versioned entities.
pub trait Versioned {
    type Key: Clone + Debug + PartialEq;

    fn key(&self) -> Self::Key;
    fn version(&self) -> i64;
    fn is_deprecated(&self) -> bool;
    fn set_deprecated(&mut self, deprecated: bool);
}

/// Reference to a versioned entity: key, revision and deprecation state.
///
/// Used both as a listing summary and as a dependency descriptor for
/// integrity checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedRef<K> {
    pub key: K,
    pub version: i64,
    pub deprecated: bool,
}

impl<K> VersionedRef<K> {
    /// Reference to whatever revision is current.
    pub fn current(key: K) -> Self {
        Self {
            key,
            version: CURRENT_VERSION,
            deprecated: false,
        }
    }

    pub fn of<E>(entity: &E) -> Self
    where
        E: Versioned<Key = K>,
    {
        Self {
            key: entity.key(),
            version: entity.version(),
            deprecated: entity.is_deprecated(),
        }
    }
}
