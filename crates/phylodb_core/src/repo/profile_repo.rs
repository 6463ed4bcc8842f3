//! Profile repository.
//!
//! # Invariants
//! - A profile is written only under a live project and a live dataset, and
//!   only when every allele call resolves to a live allele of the dataset's
//!   taxon. Tombstones of existing profiles skip these checks.
//! - Allele calls are stored as one JSON array in submission order.

use super::allele_repo::SqliteAlleleRepository;
use super::dataset_repo::{dataset_row_id, SqliteDatasetRepository};
use super::integrity::any_missing;
use super::project_repo::project_is_live;
use super::version_chain::{self, in_write_transaction, VersionChain};
use super::versioned::{PageRequest, VersionedRepository};
use super::{RepoError, RepoResult};
use crate::model::{
    AlleleCall, DatasetKey, Profile, ProfileKey, VersionSelector, VersionedRef,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) const CHAIN: VersionChain = VersionChain {
    kind: "profile",
    table: "profile_versions",
};

/// Lists the profiles of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFilter {
    pub dataset: DatasetKey,
}

impl ProfileFilter {
    pub fn new(dataset: DatasetKey) -> Self {
        Self { dataset }
    }
}

pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn references_live(&self, profile: &Profile) -> RepoResult<bool> {
        if !project_is_live(self.conn, profile.key.project_id)? {
            return Ok(false);
        }
        let datasets = SqliteDatasetRepository::new(self.conn);
        let Some(dataset) = datasets.find_current(&profile.key.dataset())? else {
            return Ok(false);
        };

        let refs: Vec<_> = profile
            .alleles
            .iter()
            .map(|call| {
                call.resolve(&dataset.taxon_id, profile.key.project_id)
                    .map(VersionedRef::current)
            })
            .collect();
        let alleles = SqliteAlleleRepository::new(self.conn);
        Ok(!any_missing(&alleles, &refs)?)
    }
}

impl VersionedRepository for SqliteProfileRepository<'_> {
    type Key = ProfileKey;
    type Entity = Profile;
    type Filter = ProfileFilter;

    fn connection(&self) -> &Connection {
        self.conn
    }

    fn find(&self, key: &ProfileKey, version: VersionSelector) -> RepoResult<Option<Profile>> {
        let Some(row_id) = profile_row_id(self.conn, key)? else {
            return Ok(None);
        };
        let Some(version) = version_chain::resolve(self.conn, CHAIN, row_id, version)? else {
            return Ok(None);
        };

        let (deprecated, aka, alleles): (i64, Option<String>, String) = self.conn.query_row(
            "SELECT deprecated, aka, alleles
             FROM profile_versions
             WHERE entity_row_id = ?1
               AND version = ?2;",
            params![row_id, version],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(Some(Profile {
            key: key.clone(),
            version,
            deprecated: version_chain::parse_bool(CHAIN, deprecated)?,
            aka,
            alleles: parse_calls(&alleles)?,
        }))
    }

    fn find_page(&self, request: PageRequest, filter: &ProfileFilter) -> RepoResult<Vec<Profile>> {
        let mut stmt = self.conn.prepare(
            "SELECT pr.profile_id, v.version, v.aka, v.alleles
             FROM profiles pr
             INNER JOIN datasets d ON d.row_id = pr.dataset_row_id
             INNER JOIN projects p ON p.row_id = d.project_row_id
             INNER JOIN profile_versions v ON v.entity_row_id = pr.row_id
             WHERE p.project_id = ?1
               AND d.dataset_id = ?2
               AND v.to_ms IS NULL
               AND v.deprecated = 0
             ORDER BY pr.profile_id ASC
             LIMIT ?3 OFFSET ?4;",
        )?;
        let mut rows = stmt.query(params![
            filter.dataset.project_id.to_string(),
            filter.dataset.id.as_str(),
            request.limit(),
            request.offset()
        ])?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next()? {
            let profile_id: String = row.get("profile_id")?;
            let alleles: String = row.get("alleles")?;
            profiles.push(Profile {
                key: ProfileKey::new(
                    filter.dataset.project_id,
                    filter.dataset.id.clone(),
                    profile_id,
                ),
                version: row.get("version")?,
                deprecated: false,
                aka: row.get("aka")?,
                alleles: parse_calls(&alleles)?,
            });
        }
        Ok(profiles)
    }

    fn save(&self, profile: &Profile) -> RepoResult<bool> {
        profile.validate()?;
        let alleles = serde_json::to_string(&profile.alleles).map_err(|err| {
            RepoError::InvalidData(format!("allele calls are not serializable: {err}"))
        })?;

        in_write_transaction(self.conn, || {
            let existing = profile_row_id(self.conn, &profile.key)?;
            let tombstone = profile.deprecated && existing.is_some();
            if !tombstone && !self.references_live(profile)? {
                debug!(
                    "event=profile_save module=repo status=skipped reason=reference_missing dataset={} profile={}",
                    profile.key.dataset_id, profile.key.id
                );
                return Ok(false);
            }

            let row_id = match existing {
                Some(row_id) => row_id,
                None => {
                    let dataset_row = dataset_row_id(self.conn, &profile.key.dataset())?
                        .ok_or_else(|| {
                            RepoError::InvalidData(format!(
                                "dataset `{}` vanished",
                                profile.key.dataset_id
                            ))
                        })?;
                    self.conn.execute(
                        "INSERT INTO profiles (dataset_row_id, profile_id) VALUES (?1, ?2);",
                        params![dataset_row, profile.key.id.as_str()],
                    )?;
                    self.conn.last_insert_rowid()
                }
            };
            version_chain::append(
                self.conn,
                CHAIN,
                row_id,
                profile.deprecated,
                &[("aka", &profile.aka), ("alleles", &alleles)],
            )?;
            Ok(true)
        })
    }
}

pub(crate) fn profile_row_id(conn: &Connection, key: &ProfileKey) -> RepoResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT pr.row_id
             FROM profiles pr
             INNER JOIN datasets d ON d.row_id = pr.dataset_row_id
             INNER JOIN projects p ON p.row_id = d.project_row_id
             WHERE p.project_id = ?1
               AND d.dataset_id = ?2
               AND pr.profile_id = ?3;",
            params![
                key.project_id.to_string(),
                key.dataset_id.as_str(),
                key.id.as_str()
            ],
            |row| row.get(0),
        )
        .optional()?)
}

fn parse_calls(value: &str) -> RepoResult<Vec<AlleleCall>> {
    serde_json::from_str(value).map_err(|err| {
        RepoError::InvalidData(format!("invalid allele calls in profile_versions.alleles: {err}"))
    })
}
