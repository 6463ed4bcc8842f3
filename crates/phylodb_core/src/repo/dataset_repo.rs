//! Dataset repository. A dataset needs a live owning project and a live
//! taxon its profiles are typed against.

use super::project_repo::{project_is_live, project_row_id};
use super::taxon_repo::taxon_is_live;
use super::version_chain::{self, in_write_transaction, VersionChain};
use super::versioned::{PageRequest, VersionedRepository};
use super::{RepoError, RepoResult};
use crate::model::{Dataset, DatasetKey, ProjectId, VersionSelector};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) const CHAIN: VersionChain = VersionChain {
    kind: "dataset",
    table: "dataset_versions",
};

/// Lists the datasets of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFilter {
    pub project_id: ProjectId,
}

impl DatasetFilter {
    pub fn new(project_id: ProjectId) -> Self {
        Self { project_id }
    }
}

pub struct SqliteDatasetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDatasetRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VersionedRepository for SqliteDatasetRepository<'_> {
    type Key = DatasetKey;
    type Entity = Dataset;
    type Filter = DatasetFilter;

    fn connection(&self) -> &Connection {
        self.conn
    }

    fn find(&self, key: &DatasetKey, version: VersionSelector) -> RepoResult<Option<Dataset>> {
        let Some(row_id) = dataset_row_id(self.conn, key)? else {
            return Ok(None);
        };
        let Some(version) = version_chain::resolve(self.conn, CHAIN, row_id, version)? else {
            return Ok(None);
        };

        let (deprecated, taxon_id, description): (i64, String, Option<String>) =
            self.conn.query_row(
                "SELECT deprecated, taxon_id, description
                 FROM dataset_versions
                 WHERE entity_row_id = ?1
                   AND version = ?2;",
                params![row_id, version],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
        Ok(Some(Dataset {
            key: key.clone(),
            version,
            deprecated: version_chain::parse_bool(CHAIN, deprecated)?,
            taxon_id,
            description,
        }))
    }

    fn find_page(&self, request: PageRequest, filter: &DatasetFilter) -> RepoResult<Vec<Dataset>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.dataset_id, v.version, v.taxon_id, v.description
             FROM datasets d
             INNER JOIN projects p ON p.row_id = d.project_row_id
             INNER JOIN dataset_versions v ON v.entity_row_id = d.row_id
             WHERE p.project_id = ?1
               AND v.to_ms IS NULL
               AND v.deprecated = 0
             ORDER BY d.dataset_id ASC
             LIMIT ?2 OFFSET ?3;",
        )?;
        let mut rows = stmt.query(params![
            filter.project_id.to_string(),
            request.limit(),
            request.offset()
        ])?;
        let mut datasets = Vec::new();
        while let Some(row) = rows.next()? {
            let dataset_id: String = row.get("dataset_id")?;
            datasets.push(Dataset {
                key: DatasetKey::new(filter.project_id, dataset_id),
                version: row.get("version")?,
                deprecated: false,
                taxon_id: row.get("taxon_id")?,
                description: row.get("description")?,
            });
        }
        Ok(datasets)
    }

    fn save(&self, dataset: &Dataset) -> RepoResult<bool> {
        dataset.validate()?;

        in_write_transaction(self.conn, || {
            let existing = dataset_row_id(self.conn, &dataset.key)?;
            let tombstone = dataset.deprecated && existing.is_some();
            if !tombstone
                && (!project_is_live(self.conn, dataset.key.project_id)?
                    || !taxon_is_live(self.conn, &dataset.taxon_id)?)
            {
                debug!(
                    "event=dataset_save module=repo status=skipped reason=parent_missing project={} taxon={}",
                    dataset.key.project_id, dataset.taxon_id
                );
                return Ok(false);
            }

            let row_id = match existing {
                Some(row_id) => row_id,
                None => {
                    let project_row = project_row_id(self.conn, dataset.key.project_id)?
                        .ok_or_else(|| {
                            RepoError::InvalidData(format!(
                                "project `{}` vanished",
                                dataset.key.project_id
                            ))
                        })?;
                    self.conn.execute(
                        "INSERT INTO datasets (project_row_id, dataset_id) VALUES (?1, ?2);",
                        params![project_row, dataset.key.id.as_str()],
                    )?;
                    self.conn.last_insert_rowid()
                }
            };
            version_chain::append(
                self.conn,
                CHAIN,
                row_id,
                dataset.deprecated,
                &[
                    ("taxon_id", &dataset.taxon_id),
                    ("description", &dataset.description),
                ],
            )?;
            Ok(true)
        })
    }
}

pub(crate) fn dataset_row_id(conn: &Connection, key: &DatasetKey) -> RepoResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT d.row_id
             FROM datasets d
             INNER JOIN projects p ON p.row_id = d.project_row_id
             WHERE p.project_id = ?1
               AND d.dataset_id = ?2;",
            params![key.project_id.to_string(), key.id.as_str()],
            |row| row.get(0),
        )
        .optional()?)
}
