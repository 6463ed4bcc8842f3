//! Visualization repository: stored layouts of inference runs.
//!
//! # Invariants
//! - Layouts are not versioned. A layout is written once under a live run
//!   and may be deprecated.
//! - A deprecated layout, or any layout of a deprecated run, is invisible
//!   to reads.
//! - Coordinates are returned in insertion order.

use super::inference_repo::live_run_row_id;
use super::version_chain::{self, in_write_transaction};
use super::versioned::PageRequest;
use super::RepoResult;
use crate::model::{Coordinate, InferenceKey, Visualization, VisualizationKey};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SqliteVisualizationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVisualizationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Stores a new layout.
    ///
    /// Returns `Ok(false)` without writing when the run is not live or the
    /// layout id is already taken under it, deprecated or not.
    pub fn save_visualization(&self, visualization: &Visualization) -> RepoResult<bool> {
        visualization.validate()?;
        let key = &visualization.key;

        in_write_transaction(self.conn, || {
            let Some(run_row) = live_run_row_id(self.conn, &key.inference())? else {
                return Ok(false);
            };
            let taken: i64 = self.conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM visualizations
                    WHERE run_row_id = ?1 AND visualization_id = ?2
                 );",
                params![run_row, key.id.as_str()],
                |row| row.get(0),
            )?;
            if taken == 1 {
                debug!(
                    "event=visualization_save module=repo status=skipped reason=exists visualization={}",
                    key.id
                );
                return Ok(false);
            }

            self.conn.execute(
                "INSERT INTO visualizations (run_row_id, visualization_id, algorithm, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    run_row,
                    key.id.as_str(),
                    visualization.algorithm.as_str(),
                    version_chain::now_ms()
                ],
            )?;
            let layout_row = self.conn.last_insert_rowid();

            let mut stmt = self.conn.prepare(
                "INSERT INTO visualization_coordinates (visualization_row_id, profile_id, x, y)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for coordinate in &visualization.coordinates {
                stmt.execute(params![
                    layout_row,
                    coordinate.profile_id.as_str(),
                    coordinate.x,
                    coordinate.y
                ])?;
            }

            info!(
                "event=visualization_save module=repo status=ok inference={} visualization={} coordinates={}",
                key.inference_id,
                key.id,
                visualization.coordinates.len()
            );
            Ok(true)
        })
    }

    pub fn find_visualization(&self, key: &VisualizationKey) -> RepoResult<Option<Visualization>> {
        let Some(run_row) = live_run_row_id(self.conn, &key.inference())? else {
            return Ok(None);
        };
        let layout: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT row_id, algorithm
                 FROM visualizations
                 WHERE run_row_id = ?1
                   AND visualization_id = ?2
                   AND deprecated = 0;",
                params![run_row, key.id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((layout_row, algorithm)) = layout else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT profile_id, x, y
             FROM visualization_coordinates
             WHERE visualization_row_id = ?1
             ORDER BY coordinate_seq ASC;",
        )?;
        let mut rows = stmt.query([layout_row])?;
        let mut coordinates = Vec::new();
        while let Some(row) = rows.next()? {
            coordinates.push(Coordinate {
                profile_id: row.get("profile_id")?,
                x: row.get("x")?,
                y: row.get("y")?,
            });
        }
        Ok(Some(Visualization {
            key: key.clone(),
            algorithm,
            coordinates,
        }))
    }

    /// Ids of the live layouts of a live run, ordered by id.
    pub fn find_visualization_ids(
        &self,
        inference: &InferenceKey,
        request: PageRequest,
    ) -> RepoResult<Vec<String>> {
        let Some(run_row) = live_run_row_id(self.conn, inference)? else {
            return Ok(Vec::new());
        };
        let mut stmt = self.conn.prepare(
            "SELECT visualization_id
             FROM visualizations
             WHERE run_row_id = ?1
               AND deprecated = 0
             ORDER BY visualization_id ASC
             LIMIT ?2 OFFSET ?3;",
        )?;
        let mut rows = stmt.query(params![run_row, request.limit(), request.offset()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    /// Deprecates a live layout. Its coordinates stay stored.
    pub fn remove_visualization(&self, key: &VisualizationKey) -> RepoResult<bool> {
        let Some(run_row) = live_run_row_id(self.conn, &key.inference())? else {
            return Ok(false);
        };
        let changed = self.conn.execute(
            "UPDATE visualizations
             SET deprecated = 1
             WHERE run_row_id = ?1
               AND visualization_id = ?2
               AND deprecated = 0;",
            params![run_row, key.id.as_str()],
        )?;
        Ok(changed > 0)
    }
}
