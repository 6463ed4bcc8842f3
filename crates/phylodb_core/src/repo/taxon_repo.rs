//! Taxon repository. Taxa are roots of the phylogeny hierarchy and have no
//! parent requirement.

use super::version_chain::{self, in_write_transaction, VersionChain};
use super::versioned::{PageRequest, VersionedRepository};
use super::RepoResult;
use crate::model::{Taxon, VersionSelector};
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) const CHAIN: VersionChain = VersionChain {
    kind: "taxon",
    table: "taxon_versions",
};

pub struct SqliteTaxonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxonRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VersionedRepository for SqliteTaxonRepository<'_> {
    type Key = String;
    type Entity = Taxon;
    type Filter = ();

    fn connection(&self) -> &Connection {
        self.conn
    }

    fn find(&self, key: &String, version: VersionSelector) -> RepoResult<Option<Taxon>> {
        let Some(row_id) = taxon_row_id(self.conn, key)? else {
            return Ok(None);
        };
        let Some(version) = version_chain::resolve(self.conn, CHAIN, row_id, version)? else {
            return Ok(None);
        };

        let (deprecated, description): (i64, Option<String>) = self.conn.query_row(
            "SELECT deprecated, description
             FROM taxon_versions
             WHERE entity_row_id = ?1
               AND version = ?2;",
            params![row_id, version],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Some(Taxon {
            id: key.clone(),
            version,
            deprecated: version_chain::parse_bool(CHAIN, deprecated)?,
            description,
        }))
    }

    fn find_page(&self, request: PageRequest, _filter: &()) -> RepoResult<Vec<Taxon>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.taxon_id, v.version, v.description
             FROM taxa t
             INNER JOIN taxon_versions v ON v.entity_row_id = t.row_id
             WHERE v.to_ms IS NULL
               AND v.deprecated = 0
             ORDER BY t.taxon_id ASC
             LIMIT ?1 OFFSET ?2;",
        )?;
        let mut rows = stmt.query(params![request.limit(), request.offset()])?;
        let mut taxa = Vec::new();
        while let Some(row) = rows.next()? {
            taxa.push(Taxon {
                id: row.get("taxon_id")?,
                version: row.get("version")?,
                deprecated: false,
                description: row.get("description")?,
            });
        }
        Ok(taxa)
    }

    fn save(&self, taxon: &Taxon) -> RepoResult<bool> {
        taxon.validate()?;

        in_write_transaction(self.conn, || {
            let row_id = match taxon_row_id(self.conn, &taxon.id)? {
                Some(row_id) => row_id,
                None => {
                    self.conn
                        .execute("INSERT INTO taxa (taxon_id) VALUES (?1);", [&taxon.id])?;
                    self.conn.last_insert_rowid()
                }
            };
            version_chain::append(
                self.conn,
                CHAIN,
                row_id,
                taxon.deprecated,
                &[("description", &taxon.description)],
            )?;
            Ok(true)
        })
    }
}

pub(crate) fn taxon_row_id(conn: &Connection, taxon_id: &str) -> RepoResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT row_id FROM taxa WHERE taxon_id = ?1;",
            [taxon_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub(crate) fn taxon_is_live(conn: &Connection, taxon_id: &str) -> RepoResult<bool> {
    match taxon_row_id(conn, taxon_id)? {
        Some(row_id) => version_chain::is_live(conn, CHAIN, row_id),
        None => Ok(false),
    }
}
