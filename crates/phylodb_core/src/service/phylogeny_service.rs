//! Taxon, locus and allele use-cases.
//!
//! # Invariants
//! - Loci are saved only under a live taxon, alleles only under a live
//!   taxon and locus (and a live project when project-scoped).
//! - Listings use the configured page size and return summary references.

use super::merge::{ConflictPolicy, MergeEngine, MergeReport};
use super::ServiceResult;
use crate::config::{CoreConfig, DEFAULT_PAGE_LIMIT};
use crate::model::{
    Allele, AlleleKey, Locus, LocusKey, Scope, Taxon, VersionSelector, VersionedRef,
};
use crate::repo::{
    in_write_transaction, AlleleFilter, LocusFilter, SqliteAlleleRepository,
    SqliteLocusRepository, SqliteTaxonRepository, VersionedRepository,
};
use log::info;
use rusqlite::Connection;

pub struct PhylogenyService<'conn> {
    conn: &'conn Connection,
    page_limit: i64,
}

impl<'conn> PhylogenyService<'conn> {
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

    fn taxa(&self) -> SqliteTaxonRepository<'conn> {
        SqliteTaxonRepository::new(self.conn)
    }

    fn loci(&self) -> SqliteLocusRepository<'conn> {
        SqliteLocusRepository::new(self.conn)
    }

    fn alleles(&self) -> SqliteAlleleRepository<'conn> {
        SqliteAlleleRepository::new(self.conn)
    }

    pub fn get_taxa(&self, page: i64) -> ServiceResult<Option<Vec<VersionedRef<String>>>> {
        Ok(self.taxa().find_all_refs(page, self.page_limit, &())?)
    }

    pub fn get_taxon(&self, taxon_id: &str, version: i64) -> ServiceResult<Option<Taxon>> {
        Ok(self
            .taxa()
            .find(&taxon_id.to_string(), VersionSelector::from_raw(version))?)
    }

    pub fn save_taxon(&self, taxon: Option<Taxon>) -> ServiceResult<bool> {
        let Some(taxon) = taxon else {
            return Ok(false);
        };
        Ok(self.taxa().save(&taxon)?)
    }

    pub fn delete_taxon(&self, taxon_id: &str) -> ServiceResult<bool> {
        Ok(self.taxa().remove(&taxon_id.to_string())?)
    }

    pub fn get_loci(
        &self,
        taxon_id: &str,
        page: i64,
    ) -> ServiceResult<Option<Vec<VersionedRef<LocusKey>>>> {
        Ok(self
            .loci()
            .find_all_refs(page, self.page_limit, &LocusFilter::new(taxon_id))?)
    }

    pub fn get_locus(&self, key: &LocusKey, version: i64) -> ServiceResult<Option<Locus>> {
        Ok(self.loci().find(key, VersionSelector::from_raw(version))?)
    }

    pub fn save_locus(&self, locus: Option<Locus>) -> ServiceResult<bool> {
        let Some(locus) = locus else {
            return Ok(false);
        };
        let taxa = self.taxa();
        let loci = self.loci();
        Ok(in_write_transaction(self.conn, || {
            if !taxa.exists(&locus.key.taxon_id)? {
                return Ok(false);
            }
            loci.save(&locus)
        })?)
    }

    pub fn delete_locus(&self, key: &LocusKey) -> ServiceResult<bool> {
        Ok(self.loci().remove(key)?)
    }

    pub fn get_alleles(
        &self,
        taxon_id: &str,
        locus_id: &str,
        scope: Scope,
        page: i64,
    ) -> ServiceResult<Option<Vec<VersionedRef<AlleleKey>>>> {
        let filter = AlleleFilter::new(taxon_id, locus_id, scope);
        Ok(self.alleles().find_all_refs(page, self.page_limit, &filter)?)
    }

    pub fn get_allele(&self, key: &AlleleKey, version: i64) -> ServiceResult<Option<Allele>> {
        Ok(self.alleles().find(key, VersionSelector::from_raw(version))?)
    }

    pub fn save_allele(&self, allele: Option<Allele>) -> ServiceResult<bool> {
        let Some(allele) = allele else {
            return Ok(false);
        };
        let taxa = self.taxa();
        let loci = self.loci();
        let alleles = self.alleles();
        Ok(in_write_transaction(self.conn, || {
            if !taxa.exists(&allele.key.taxon_id)? || !loci.exists(&allele.key.locus())? {
                return Ok(false);
            }
            alleles.save(&allele)
        })?)
    }

    pub fn delete_allele(&self, key: &AlleleKey) -> ServiceResult<bool> {
        Ok(self.alleles().remove(key)?)
    }

    /// Imports alleles of one locus, keeping stored sequences on conflict.
    pub fn save_alleles_on_conflict_skip(
        &self,
        locus: &LocusKey,
        alleles: &[Allele],
    ) -> ServiceResult<bool> {
        Ok(self
            .import_alleles(locus, alleles, ConflictPolicy::Skip)?
            .is_some_and(|report| report.wrote_any()))
    }

    /// Imports alleles of one locus, appending differing sequences as new
    /// revisions.
    pub fn save_alleles_on_conflict_update(
        &self,
        locus: &LocusKey,
        alleles: &[Allele],
    ) -> ServiceResult<bool> {
        Ok(self
            .import_alleles(locus, alleles, ConflictPolicy::Update)?
            .is_some_and(|report| report.wrote_any()))
    }

    /// Merges a batch of alleles into `locus`.
    ///
    /// `None` when the locus is not live or an allele belongs to another
    /// locus; nothing is written in that case.
    pub fn import_alleles(
        &self,
        locus: &LocusKey,
        alleles: &[Allele],
        policy: ConflictPolicy,
    ) -> ServiceResult<Option<MergeReport<AlleleKey>>> {
        if alleles.iter().any(|allele| allele.key.locus() != *locus) {
            return Ok(None);
        }
        let loci = self.loci();
        let repo = self.alleles();
        let report = in_write_transaction(self.conn, || {
            if !loci.exists(locus)? {
                return Ok(None);
            }
            MergeEngine::new(policy).merge(&repo, alleles).map(Some)
        })?;

        if let Some(report) = report.as_ref() {
            info!(
                "event=allele_import module=service status=ok taxon={} locus={} written={}",
                locus.taxon_id,
                locus.id,
                report.written.len()
            );
        }
        Ok(report)
    }
}
