//! Inference repository: distance edges of one inference run.
//!
//! # Invariants
//! - Runs are not versioned. A run is written once and may be deprecated.
//! - Edges are returned in insertion order.
//! - One run holds at most one edge per ordered `(from, to)` pair.

use super::dataset_repo::{self, dataset_row_id};
use super::version_chain::{self, in_write_transaction};
use super::RepoResult;
use crate::model::{DatasetKey, DistanceEdge, InferenceKey};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

pub struct SqliteInferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInferenceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Stores the edges of a new run.
    ///
    /// Returns `Ok(false)` without writing when the dataset is not live, the
    /// run id is already taken, or the edge list repeats a `(from, to)` pair.
    pub fn save_inference(&self, key: &InferenceKey, edges: &[DistanceEdge]) -> RepoResult<bool> {
        key.validate()?;
        let mut pairs = HashSet::new();
        if !edges
            .iter()
            .all(|edge| pairs.insert((edge.from.as_str(), edge.to.as_str())))
        {
            debug!(
                "event=inference_save module=repo status=skipped reason=duplicate_edge inference={}",
                key.id
            );
            return Ok(false);
        }

        in_write_transaction(self.conn, || {
            let Some(dataset_row) = dataset_row_id(self.conn, &key.dataset())? else {
                return Ok(false);
            };
            if !version_chain::is_live(self.conn, dataset_repo::CHAIN, dataset_row)? {
                return Ok(false);
            }
            if run_row_id(self.conn, dataset_row, &key.id)?.is_some() {
                debug!(
                    "event=inference_save module=repo status=skipped reason=run_exists inference={}",
                    key.id
                );
                return Ok(false);
            }

            self.conn.execute(
                "INSERT INTO inference_runs (dataset_row_id, inference_id, created_at)
                 VALUES (?1, ?2, ?3);",
                params![dataset_row, key.id.as_str(), version_chain::now_ms()],
            )?;
            let run_row = self.conn.last_insert_rowid();

            let mut stmt = self.conn.prepare(
                "INSERT INTO inference_edges (run_row_id, from_profile, to_profile, distance)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for edge in edges {
                stmt.execute(params![
                    run_row,
                    edge.from.as_str(),
                    edge.to.as_str(),
                    edge.distance
                ])?;
            }

            info!(
                "event=inference_save module=repo status=ok inference={} edges={}",
                key.id,
                edges.len()
            );
            Ok(true)
        })
    }

    /// Edges of a live run in insertion order, `None` when the run is missing
    /// or deprecated.
    pub fn find_edges(&self, key: &InferenceKey) -> RepoResult<Option<Vec<DistanceEdge>>> {
        let Some(run_row) = live_run_row_id(self.conn, key)? else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT from_profile, to_profile, distance
             FROM inference_edges
             WHERE run_row_id = ?1
             ORDER BY edge_seq ASC;",
        )?;
        let mut rows = stmt.query([run_row])?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            edges.push(DistanceEdge {
                from: row.get("from_profile")?,
                to: row.get("to_profile")?,
                distance: row.get("distance")?,
            });
        }
        Ok(Some(edges))
    }

    /// Deprecates a live run. Its edges stay stored.
    pub fn remove_inference(&self, key: &InferenceKey) -> RepoResult<bool> {
        let Some(dataset_row) = dataset_row_id(self.conn, &key.dataset())? else {
            return Ok(false);
        };
        let changed = self.conn.execute(
            "UPDATE inference_runs
             SET deprecated = 1
             WHERE dataset_row_id = ?1
               AND inference_id = ?2
               AND deprecated = 0;",
            params![dataset_row, key.id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Ids of the live runs of a dataset, oldest first.
    pub fn find_inference_ids(&self, dataset: &DatasetKey) -> RepoResult<Vec<String>> {
        let Some(dataset_row) = dataset_row_id(self.conn, dataset)? else {
            return Ok(Vec::new());
        };
        let mut stmt = self.conn.prepare(
            "SELECT inference_id
             FROM inference_runs
             WHERE dataset_row_id = ?1
               AND deprecated = 0
             ORDER BY row_id ASC;",
        )?;
        let mut rows = stmt.query([dataset_row])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

fn run_row_id(conn: &Connection, dataset_row: i64, inference_id: &str) -> RepoResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT row_id
             FROM inference_runs
             WHERE dataset_row_id = ?1
               AND inference_id = ?2;",
            params![dataset_row, inference_id],
            |row| row.get(0),
        )
        .optional()?)
}

/// Row id of a live (non-deprecated) run.
pub(crate) fn live_run_row_id(conn: &Connection, key: &InferenceKey) -> RepoResult<Option<i64>> {
    let Some(dataset_row) = dataset_row_id(conn, &key.dataset())? else {
        return Ok(None);
    };
    Ok(conn
        .query_row(
            "SELECT row_id
             FROM inference_runs
             WHERE dataset_row_id = ?1
               AND inference_id = ?2
               AND deprecated = 0;",
            params![dataset_row, key.id.as_str()],
            |row| row.get(0),
        )
        .optional()?)
}
