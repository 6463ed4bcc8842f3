//! Project repository: versioned project metadata.

use super::version_chain::{self, in_write_transaction, VersionChain};
use super::versioned::{PageRequest, VersionedRepository};
use super::{RepoError, RepoResult};
use crate::model::{Project, ProjectId, VersionSelector, Visibility};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub(crate) const CHAIN: VersionChain = VersionChain {
    kind: "project",
    table: "project_versions",
};

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load(&self, id: ProjectId, row_id: i64, version: i64) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT version, deprecated, name, visibility, description
             FROM project_versions
             WHERE entity_row_id = ?1
               AND version = ?2;",
        )?;
        let mut rows = stmt.query(params![row_id, version])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_project(id, row)?)),
            None => Ok(None),
        }
    }
}

impl VersionedRepository for SqliteProjectRepository<'_> {
    type Key = ProjectId;
    type Entity = Project;
    type Filter = ();

    fn connection(&self) -> &Connection {
        self.conn
    }

    fn find(&self, key: &ProjectId, version: VersionSelector) -> RepoResult<Option<Project>> {
        let Some(row_id) = project_row_id(self.conn, *key)? else {
            return Ok(None);
        };
        match version_chain::resolve(self.conn, CHAIN, row_id, version)? {
            Some(version) => self.load(*key, row_id, version),
            None => Ok(None),
        }
    }

    fn find_page(&self, request: PageRequest, _filter: &()) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.project_id, v.version, v.deprecated, v.name, v.visibility, v.description
             FROM projects p
             INNER JOIN project_versions v ON v.entity_row_id = p.row_id
             WHERE v.to_ms IS NULL
               AND v.deprecated = 0
             ORDER BY p.project_id ASC
             LIMIT ?1 OFFSET ?2;",
        )?;
        let mut rows = stmt.query(params![request.limit(), request.offset()])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("project_id")?;
            projects.push(map_project(parse_project_id(&id_text)?, row)?);
        }
        Ok(projects)
    }

    fn save(&self, project: &Project) -> RepoResult<bool> {
        project.validate()?;

        in_write_transaction(self.conn, || {
            let row_id = match project_row_id(self.conn, project.id)? {
                Some(row_id) => row_id,
                None => {
                    self.conn.execute(
                        "INSERT INTO projects (project_id) VALUES (?1);",
                        [project.id.to_string()],
                    )?;
                    self.conn.last_insert_rowid()
                }
            };
            let visibility = project.visibility.as_db();
            version_chain::append(
                self.conn,
                CHAIN,
                row_id,
                project.deprecated,
                &[
                    ("name", &project.name),
                    ("visibility", &visibility),
                    ("description", &project.description),
                ],
            )?;
            Ok(true)
        })
    }
}

pub(crate) fn project_row_id(conn: &Connection, id: ProjectId) -> RepoResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT row_id FROM projects WHERE project_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?)
}

/// True when the project exists and its current revision is not deprecated.
pub(crate) fn project_is_live(conn: &Connection, id: ProjectId) -> RepoResult<bool> {
    match project_row_id(conn, id)? {
        Some(row_id) => version_chain::is_live(conn, CHAIN, row_id),
        None => Ok(false),
    }
}

pub(crate) fn parse_project_id(value: &str) -> RepoResult<ProjectId> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in projects.project_id"))
    })
}

fn map_project(id: ProjectId, row: &Row<'_>) -> RepoResult<Project> {
    let visibility_text: String = row.get("visibility")?;
    let visibility = Visibility::parse_db(&visibility_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid visibility `{visibility_text}` in project_versions.visibility"
        ))
    })?;
    Ok(Project {
        id,
        version: row.get("version")?,
        deprecated: version_chain::parse_bool(CHAIN, row.get("deprecated")?)?,
        name: row.get("name")?,
        visibility,
        description: row.get("description")?,
    })
}
