//! Locus repository. A locus may only be written under a live taxon.

use super::taxon_repo::{taxon_is_live, taxon_row_id};
use super::version_chain::{self, in_write_transaction, VersionChain};
use super::versioned::{PageRequest, VersionedRepository};
use super::{RepoError, RepoResult};
use crate::model::{Locus, LocusKey, VersionSelector};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) const CHAIN: VersionChain = VersionChain {
    kind: "locus",
    table: "locus_versions",
};

/// Lists the loci of one taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocusFilter {
    pub taxon_id: String,
}

impl LocusFilter {
    pub fn new(taxon_id: impl Into<String>) -> Self {
        Self {
            taxon_id: taxon_id.into(),
        }
    }
}

pub struct SqliteLocusRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLocusRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VersionedRepository for SqliteLocusRepository<'_> {
    type Key = LocusKey;
    type Entity = Locus;
    type Filter = LocusFilter;

    fn connection(&self) -> &Connection {
        self.conn
    }

    fn find(&self, key: &LocusKey, version: VersionSelector) -> RepoResult<Option<Locus>> {
        let Some(row_id) = locus_row_id(self.conn, key)? else {
            return Ok(None);
        };
        let Some(version) = version_chain::resolve(self.conn, CHAIN, row_id, version)? else {
            return Ok(None);
        };

        let (deprecated, description): (i64, Option<String>) = self.conn.query_row(
            "SELECT deprecated, description
             FROM locus_versions
             WHERE entity_row_id = ?1
               AND version = ?2;",
            params![row_id, version],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Some(Locus {
            key: key.clone(),
            version,
            deprecated: version_chain::parse_bool(CHAIN, deprecated)?,
            description,
        }))
    }

    fn find_page(&self, request: PageRequest, filter: &LocusFilter) -> RepoResult<Vec<Locus>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.locus_id, v.version, v.description
             FROM loci l
             INNER JOIN taxa t ON t.row_id = l.taxon_row_id
             INNER JOIN locus_versions v ON v.entity_row_id = l.row_id
             WHERE t.taxon_id = ?1
               AND v.to_ms IS NULL
               AND v.deprecated = 0
             ORDER BY l.locus_id ASC
             LIMIT ?2 OFFSET ?3;",
        )?;
        let mut rows = stmt.query(params![
            filter.taxon_id.as_str(),
            request.limit(),
            request.offset()
        ])?;
        let mut loci = Vec::new();
        while let Some(row) = rows.next()? {
            let locus_id: String = row.get("locus_id")?;
            loci.push(Locus {
                key: LocusKey::new(filter.taxon_id.clone(), locus_id),
                version: row.get("version")?,
                deprecated: false,
                description: row.get("description")?,
            });
        }
        Ok(loci)
    }

    fn save(&self, locus: &Locus) -> RepoResult<bool> {
        locus.validate()?;

        in_write_transaction(self.conn, || {
            let existing = locus_row_id(self.conn, &locus.key)?;
            let tombstone = locus.deprecated && existing.is_some();
            if !tombstone && !taxon_is_live(self.conn, &locus.key.taxon_id)? {
                debug!(
                    "event=locus_save module=repo status=skipped reason=parent_missing taxon={}",
                    locus.key.taxon_id
                );
                return Ok(false);
            }

            let row_id = match existing {
                Some(row_id) => row_id,
                None => {
                    let taxon_row = taxon_row_id(self.conn, &locus.key.taxon_id)?.ok_or_else(
                        || RepoError::InvalidData(format!("taxon `{}` vanished", locus.key.taxon_id)),
                    )?;
                    self.conn.execute(
                        "INSERT INTO loci (taxon_row_id, locus_id) VALUES (?1, ?2);",
                        params![taxon_row, locus.key.id.as_str()],
                    )?;
                    self.conn.last_insert_rowid()
                }
            };
            version_chain::append(
                self.conn,
                CHAIN,
                row_id,
                locus.deprecated,
                &[("description", &locus.description)],
            )?;
            Ok(true)
        })
    }
}

pub(crate) fn locus_row_id(conn: &Connection, key: &LocusKey) -> RepoResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT l.row_id
             FROM loci l
             INNER JOIN taxa t ON t.row_id = l.taxon_row_id
             WHERE t.taxon_id = ?1
               AND l.locus_id = ?2;",
            params![key.taxon_id.as_str(), key.id.as_str()],
            |row| row.get(0),
        )
        .optional()?)
}

pub(crate) fn locus_is_live(conn: &Connection, key: &LocusKey) -> RepoResult<bool> {
    match locus_row_id(conn, key)? {
        Some(row_id) => version_chain::is_live(conn, CHAIN, row_id),
        None => Ok(false),
    }
}
