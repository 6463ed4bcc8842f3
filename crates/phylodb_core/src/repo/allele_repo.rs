//! Allele repository.
//!
//! # Invariants
//! - A global allele and a project-scoped allele with equal ids live in
//!   different identity rows and keep independent histories.
//! - Saving requires a live taxon and locus, plus a live project for
//!   project-scoped alleles. Tombstones of existing alleles skip the check.

use super::locus_repo::{locus_is_live, locus_row_id};
use super::project_repo::{project_is_live, project_row_id};
use super::taxon_repo::taxon_is_live;
use super::version_chain::{self, in_write_transaction, VersionChain};
use super::versioned::{PageRequest, VersionedRepository};
use super::{RepoError, RepoResult};
use crate::model::{Allele, AlleleKey, Scope, VersionSelector};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) const CHAIN: VersionChain = VersionChain {
    kind: "allele",
    table: "allele_versions",
};

// `?4` is the project id text, NULL for global alleles.
const SCOPE_MATCH_SQL: &str = "((?4 IS NULL AND a.project_row_id IS NULL)
    OR a.project_row_id = (SELECT row_id FROM projects WHERE project_id = ?4))";

/// Lists the alleles of one locus under exactly one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleFilter {
    pub taxon_id: String,
    pub locus_id: String,
    pub scope: Scope,
}

impl AlleleFilter {
    pub fn new(taxon_id: impl Into<String>, locus_id: impl Into<String>, scope: Scope) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            locus_id: locus_id.into(),
            scope,
        }
    }
}

pub struct SqliteAlleleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAlleleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn parents_live(&self, key: &AlleleKey) -> RepoResult<bool> {
        if !taxon_is_live(self.conn, &key.taxon_id)? || !locus_is_live(self.conn, &key.locus())? {
            return Ok(false);
        }
        match key.scope {
            Scope::Global => Ok(true),
            Scope::Project(project_id) => project_is_live(self.conn, project_id),
        }
    }

    fn insert_identity(&self, key: &AlleleKey) -> RepoResult<i64> {
        let locus_row = locus_row_id(self.conn, &key.locus())?.ok_or_else(|| {
            RepoError::InvalidData(format!("locus `{}` vanished", key.locus_id))
        })?;
        let project_row = match key.scope {
            Scope::Global => None,
            Scope::Project(project_id) => Some(
                project_row_id(self.conn, project_id)?.ok_or_else(|| {
                    RepoError::InvalidData(format!("project `{project_id}` vanished"))
                })?,
            ),
        };
        self.conn.execute(
            "INSERT INTO alleles (locus_row_id, allele_id, project_row_id) VALUES (?1, ?2, ?3);",
            params![locus_row, key.id.as_str(), project_row],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl VersionedRepository for SqliteAlleleRepository<'_> {
    type Key = AlleleKey;
    type Entity = Allele;
    type Filter = AlleleFilter;

    fn connection(&self) -> &Connection {
        self.conn
    }

    fn find(&self, key: &AlleleKey, version: VersionSelector) -> RepoResult<Option<Allele>> {
        let Some(row_id) = allele_row_id(self.conn, key)? else {
            return Ok(None);
        };
        let Some(version) = version_chain::resolve(self.conn, CHAIN, row_id, version)? else {
            return Ok(None);
        };

        let (deprecated, sequence): (i64, Option<String>) = self.conn.query_row(
            "SELECT deprecated, sequence
             FROM allele_versions
             WHERE entity_row_id = ?1
               AND version = ?2;",
            params![row_id, version],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Some(Allele {
            key: key.clone(),
            version,
            deprecated: version_chain::parse_bool(CHAIN, deprecated)?,
            sequence,
        }))
    }

    fn find_page(&self, request: PageRequest, filter: &AlleleFilter) -> RepoResult<Vec<Allele>> {
        let sql = format!(
            "SELECT a.allele_id, v.version, v.sequence
             FROM alleles a
             INNER JOIN loci l ON l.row_id = a.locus_row_id
             INNER JOIN taxa t ON t.row_id = l.taxon_row_id
             INNER JOIN allele_versions v ON v.entity_row_id = a.row_id
             WHERE t.taxon_id = ?1
               AND l.locus_id = ?2
               AND v.to_ms IS NULL
               AND v.deprecated = 0
               AND {SCOPE_MATCH_SQL}
             ORDER BY a.allele_id ASC
             LIMIT ?3 OFFSET ?5;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let project = filter.scope.project_id().map(|id| id.to_string());
        let mut rows = stmt.query(params![
            filter.taxon_id.as_str(),
            filter.locus_id.as_str(),
            request.limit(),
            project,
            request.offset()
        ])?;
        let mut alleles = Vec::new();
        while let Some(row) = rows.next()? {
            let allele_id: String = row.get("allele_id")?;
            alleles.push(Allele {
                key: AlleleKey::new(
                    filter.taxon_id.clone(),
                    filter.locus_id.clone(),
                    allele_id,
                    filter.scope,
                ),
                version: row.get("version")?,
                deprecated: false,
                sequence: row.get("sequence")?,
            });
        }
        Ok(alleles)
    }

    fn save(&self, allele: &Allele) -> RepoResult<bool> {
        allele.validate()?;

        in_write_transaction(self.conn, || {
            let existing = allele_row_id(self.conn, &allele.key)?;
            let tombstone = allele.deprecated && existing.is_some();
            if !tombstone && !self.parents_live(&allele.key)? {
                debug!(
                    "event=allele_save module=repo status=skipped reason=parent_missing taxon={} locus={}",
                    allele.key.taxon_id, allele.key.locus_id
                );
                return Ok(false);
            }

            let row_id = match existing {
                Some(row_id) => row_id,
                None => self.insert_identity(&allele.key)?,
            };
            version_chain::append(
                self.conn,
                CHAIN,
                row_id,
                allele.deprecated,
                &[("sequence", &allele.sequence)],
            )?;
            Ok(true)
        })
    }
}

pub(crate) fn allele_row_id(conn: &Connection, key: &AlleleKey) -> RepoResult<Option<i64>> {
    let sql = format!(
        "SELECT a.row_id
         FROM alleles a
         INNER JOIN loci l ON l.row_id = a.locus_row_id
         INNER JOIN taxa t ON t.row_id = l.taxon_row_id
         WHERE t.taxon_id = ?1
           AND l.locus_id = ?2
           AND a.allele_id = ?3
           AND {SCOPE_MATCH_SQL};"
    );
    let project = key.scope.project_id().map(|id| id.to_string());
    Ok(conn
        .query_row(
            &sql,
            params![
                key.taxon_id.as_str(),
                key.locus_id.as_str(),
                key.id.as_str(),
                project
            ],
            |row| row.get(0),
        )
        .optional()?)
}
