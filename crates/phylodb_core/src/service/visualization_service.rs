//! Inference storage, tree reads and stored layouts.
//!
//! # Invariants
//! - Inference runs and layouts reference only live profiles of their
//!   dataset. The check and the write share one transaction.
//! - Layout listings follow the conflated paging contract.

use super::ServiceResult;
use crate::config::{CoreConfig, DEFAULT_PAGE_LIMIT};
use crate::model::{
    DatasetKey, DistanceEdge, InferenceKey, ProfileKey, VersionedRef, Visualization,
    VisualizationKey,
};
use crate::repo::{
    any_missing, in_write_transaction, PageRequest, RepoResult, SqliteDatasetRepository,
    SqliteInferenceRepository, SqliteProfileRepository, SqliteVisualizationRepository,
    VersionedRepository,
};
use crate::visualization::{Tree, TreeBuilder};
use rusqlite::Connection;
use std::collections::HashSet;

pub struct VisualizationService<'conn> {
    conn: &'conn Connection,
    builder: TreeBuilder,
    page_limit: i64,
}

impl<'conn> VisualizationService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            builder: TreeBuilder::default(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn from_config(conn: &'conn Connection, config: &CoreConfig) -> Self {
        Self {
            conn,
            builder: TreeBuilder::new(config.visualization.max_tree_depth),
            page_limit: config.paging.default_limit,
        }
    }

    /// Stores an inference run. Requires a live dataset and a live profile
    /// for every edge endpoint; otherwise nothing is written.
    pub fn save_inference(&self, key: &InferenceKey, edges: &[DistanceEdge]) -> ServiceResult<bool> {
        let datasets = SqliteDatasetRepository::new(self.conn);
        let inferences = SqliteInferenceRepository::new(self.conn);

        Ok(in_write_transaction(self.conn, || {
            if !datasets.exists(&key.dataset())? {
                return Ok(false);
            }
            let profile_ids = edges
                .iter()
                .flat_map(|edge| [edge.from.as_str(), edge.to.as_str()]);
            if self.profiles_missing(&key.dataset(), profile_ids)? {
                return Ok(false);
            }
            inferences.save_inference(key, edges)
        })?)
    }

    pub fn get_inferences(&self, dataset: &DatasetKey) -> ServiceResult<Vec<String>> {
        Ok(SqliteInferenceRepository::new(self.conn).find_inference_ids(dataset)?)
    }

    pub fn delete_inference(&self, key: &InferenceKey) -> ServiceResult<bool> {
        Ok(SqliteInferenceRepository::new(self.conn).remove_inference(key)?)
    }

    /// Rebuilds the forest of one live inference run.
    pub fn tree(&self, key: &InferenceKey) -> ServiceResult<Option<Tree>> {
        let Some(edges) = SqliteInferenceRepository::new(self.conn).find_edges(key)? else {
            return Ok(None);
        };
        Ok(Some(self.builder.build(&edges)?))
    }

    /// Stores a layout of a live run. Every placed profile must be live in
    /// the run's dataset; otherwise nothing is written.
    pub fn save_visualization(&self, visualization: Option<Visualization>) -> ServiceResult<bool> {
        let Some(visualization) = visualization else {
            return Ok(false);
        };
        let layouts = SqliteVisualizationRepository::new(self.conn);
        let dataset = visualization.key.inference().dataset();

        Ok(in_write_transaction(self.conn, || {
            let profile_ids = visualization
                .coordinates
                .iter()
                .map(|coordinate| coordinate.profile_id.as_str());
            if self.profiles_missing(&dataset, profile_ids)? {
                return Ok(false);
            }
            layouts.save_visualization(&visualization)
        })?)
    }

    pub fn get_visualizations(
        &self,
        inference: &InferenceKey,
        page: i64,
    ) -> ServiceResult<Option<Vec<String>>> {
        let Ok(request) = PageRequest::new(page, self.page_limit) else {
            return Ok(None);
        };
        let ids = SqliteVisualizationRepository::new(self.conn)
            .find_visualization_ids(inference, request)?;
        Ok((!ids.is_empty()).then_some(ids))
    }

    pub fn get_visualization(&self, key: &VisualizationKey) -> ServiceResult<Option<Visualization>> {
        Ok(SqliteVisualizationRepository::new(self.conn).find_visualization(key)?)
    }

    pub fn delete_visualization(&self, key: &VisualizationKey) -> ServiceResult<bool> {
        Ok(SqliteVisualizationRepository::new(self.conn).remove_visualization(key)?)
    }

    /// True when any of `profile_ids` is not a live profile of `dataset`.
    fn profiles_missing<'p>(
        &self,
        dataset: &DatasetKey,
        profile_ids: impl Iterator<Item = &'p str>,
    ) -> RepoResult<bool> {
        let mut seen = HashSet::new();
        let refs: Vec<Option<VersionedRef<ProfileKey>>> = profile_ids
            .filter(|profile_id| seen.insert(*profile_id))
            .map(|profile_id| {
                Some(VersionedRef::current(ProfileKey::new(
                    dataset.project_id,
                    dataset.id.clone(),
                    profile_id,
                )))
            })
            .collect();
        any_missing(&SqliteProfileRepository::new(self.conn), &refs)
    }
}
