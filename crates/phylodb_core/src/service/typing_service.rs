//! Project, dataset and profile use-cases.
//!
//! # Invariants
//! - Datasets are saved only under a live project and a live taxon.
//! - Profiles are saved only when their dataset is live and every allele
//!   call resolves to a live allele. The check and the write share one
//!   transaction.
//! - Calls marked private are accepted only when the caller enables
//!   `private_alleles`; they resolve under the dataset's project scope.

use super::merge::{ConflictPolicy, MergeEngine, MergeReport};
use super::ServiceResult;
use crate::config::{CoreConfig, DEFAULT_PAGE_LIMIT};
use crate::model::{
    AlleleKey, Dataset, DatasetKey, Profile, ProfileKey, Project, ProjectId, VersionSelector,
    VersionedRef,
};
use crate::repo::{
    any_missing, in_write_transaction, DatasetFilter, ProfileFilter, RepoResult,
    SqliteAlleleRepository, SqliteDatasetRepository, SqliteProfileRepository,
    SqliteProjectRepository, SqliteTaxonRepository, VersionedRepository,
};
use log::{info, warn};
use rusqlite::Connection;

pub struct TypingService<'conn> {
    conn: &'conn Connection,
    page_limit: i64,
}

impl<'conn> TypingService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn from_config(conn: &'conn Connection, config: &CoreConfig) -> Self {
        Self {
            conn,
            page_limit: config.paging.default_limit,
        }
    }

    fn projects(&self) -> SqliteProjectRepository<'conn> {
        SqliteProjectRepository::new(self.conn)
    }

    fn datasets(&self) -> SqliteDatasetRepository<'conn> {
        SqliteDatasetRepository::new(self.conn)
    }

    fn profiles(&self) -> SqliteProfileRepository<'conn> {
        SqliteProfileRepository::new(self.conn)
    }

    pub fn get_projects(&self, page: i64) -> ServiceResult<Option<Vec<VersionedRef<ProjectId>>>> {
        Ok(self.projects().find_all_refs(page, self.page_limit, &())?)
    }

    pub fn get_project(&self, id: ProjectId, version: i64) -> ServiceResult<Option<Project>> {
        Ok(self.projects().find(&id, VersionSelector::from_raw(version))?)
    }

    pub fn save_project(&self, project: Option<Project>) -> ServiceResult<bool> {
        let Some(project) = project else {
            return Ok(false);
        };
        Ok(self.projects().save(&project)?)
    }

    pub fn delete_project(&self, id: ProjectId) -> ServiceResult<bool> {
        Ok(self.projects().remove(&id)?)
    }

    pub fn get_datasets(
        &self,
        project_id: ProjectId,
        page: i64,
    ) -> ServiceResult<Option<Vec<VersionedRef<DatasetKey>>>> {
        Ok(self
            .datasets()
            .find_all_refs(page, self.page_limit, &DatasetFilter::new(project_id))?)
    }

    pub fn get_dataset(&self, key: &DatasetKey, version: i64) -> ServiceResult<Option<Dataset>> {
        Ok(self.datasets().find(key, VersionSelector::from_raw(version))?)
    }

    pub fn save_dataset(&self, dataset: Option<Dataset>) -> ServiceResult<bool> {
        let Some(dataset) = dataset else {
            return Ok(false);
        };
        let projects = self.projects();
        let taxa = SqliteTaxonRepository::new(self.conn);
        let datasets = self.datasets();
        Ok(in_write_transaction(self.conn, || {
            if !projects.exists(&dataset.key.project_id)? || !taxa.exists(&dataset.taxon_id)? {
                return Ok(false);
            }
            datasets.save(&dataset)
        })?)
    }

    pub fn delete_dataset(&self, key: &DatasetKey) -> ServiceResult<bool> {
        Ok(self.datasets().remove(key)?)
    }

    pub fn get_profiles(
        &self,
        dataset: &DatasetKey,
        page: i64,
    ) -> ServiceResult<Option<Vec<VersionedRef<ProfileKey>>>> {
        let filter = ProfileFilter::new(dataset.clone());
        Ok(self.profiles().find_all_refs(page, self.page_limit, &filter)?)
    }

    pub fn get_profile(&self, key: &ProfileKey, version: i64) -> ServiceResult<Option<Profile>> {
        Ok(self.profiles().find(key, VersionSelector::from_raw(version))?)
    }

    pub fn save_profile(
        &self,
        profile: Option<Profile>,
        private_alleles: bool,
    ) -> ServiceResult<bool> {
        let Some(profile) = profile else {
            return Ok(false);
        };
        if !private_alleles && profile.has_private_alleles() {
            return Ok(false);
        }
        let profiles = self.profiles();
        Ok(in_write_transaction(self.conn, || {
            if !self.references_live(&profile.key.dataset(), std::slice::from_ref(&profile))? {
                return Ok(false);
            }
            profiles.save(&profile)
        })?)
    }

    pub fn delete_profile(&self, key: &ProfileKey) -> ServiceResult<bool> {
        Ok(self.profiles().remove(key)?)
    }

    pub fn save_profiles_on_conflict_skip(
        &self,
        dataset: &DatasetKey,
        profiles: &[Profile],
        private_alleles: bool,
    ) -> ServiceResult<bool> {
        Ok(self
            .import_profiles(dataset, profiles, private_alleles, ConflictPolicy::Skip)?
            .is_some_and(|report| report.wrote_any()))
    }

    pub fn save_profiles_on_conflict_update(
        &self,
        dataset: &DatasetKey,
        profiles: &[Profile],
        private_alleles: bool,
    ) -> ServiceResult<bool> {
        Ok(self
            .import_profiles(dataset, profiles, private_alleles, ConflictPolicy::Update)?
            .is_some_and(|report| report.wrote_any()))
    }

    /// Merges a batch of profiles into `dataset`.
    ///
    /// `None`, with nothing written, when a profile belongs to another
    /// dataset, carries private calls without `private_alleles`, or
    /// references a missing allele, or when the dataset is not live.
    pub fn import_profiles(
        &self,
        dataset: &DatasetKey,
        profiles: &[Profile],
        private_alleles: bool,
        policy: ConflictPolicy,
    ) -> ServiceResult<Option<MergeReport<ProfileKey>>> {
        if profiles.iter().any(|profile| profile.key.dataset() != *dataset) {
            return Ok(None);
        }
        if !private_alleles && profiles.iter().any(Profile::has_private_alleles) {
            warn!(
                "event=profile_import module=service status=rejected reason=private_alleles dataset={}",
                dataset.id
            );
            return Ok(None);
        }

        let repo = self.profiles();
        let report = in_write_transaction(self.conn, || {
            if !self.references_live(dataset, profiles)? {
                return Ok(None);
            }
            MergeEngine::new(policy).merge(&repo, profiles).map(Some)
        })?;

        match report.as_ref() {
            Some(report) => info!(
                "event=profile_import module=service status=ok dataset={} written={} skipped={}",
                dataset.id,
                report.written.len(),
                report.skipped.len()
            ),
            None => warn!(
                "event=profile_import module=service status=rejected reason=reference_missing dataset={}",
                dataset.id
            ),
        }
        Ok(report)
    }

    /// Dataset is live and every allele call of `profiles` resolves.
    fn references_live(&self, dataset: &DatasetKey, profiles: &[Profile]) -> RepoResult<bool> {
        let Some(current) = self.datasets().find_current(dataset)? else {
            return Ok(false);
        };
        let refs: Vec<Option<VersionedRef<AlleleKey>>> = profiles
            .iter()
            .flat_map(|profile| profile.alleles.iter())
            .map(|call| {
                call.resolve(&current.taxon_id, dataset.project_id)
                    .map(VersionedRef::current)
            })
            .collect();
        let alleles = SqliteAlleleRepository::new(self.conn);
        Ok(!any_missing(&alleles, &refs)?)
    }
}
