use phylodb_core::db::open_db_in_memory;
use phylodb_core::repo::{
    AlleleFilter, LocusFilter, SqliteAlleleRepository, SqliteLocusRepository,
    SqliteProjectRepository, SqliteTaxonRepository,
};
use phylodb_core::{
    Allele, AlleleKey, Locus, PageError, PageRequest, Project, Scope, Taxon, VersionedRepository,
};
use rusqlite::Connection;

fn seed_alleles(conn: &Connection, count: usize) {
    SqliteTaxonRepository::new(conn)
        .save(&Taxon::new("t", None))
        .unwrap();
    SqliteLocusRepository::new(conn)
        .save(&Locus::new("t", "adk", None))
        .unwrap();
    let repo = SqliteAlleleRepository::new(conn);
    for index in 1..=count {
        let key = AlleleKey::new("t", "adk", format!("{index}test"), Scope::Global);
        repo.save(&Allele::new(key, Some("ACGT".to_string()))).unwrap();
    }
}

fn global_filter() -> AlleleFilter {
    AlleleFilter::new("t", "adk", Scope::Global)
}

fn ids(alleles: &[Allele]) -> Vec<&str> {
    alleles.iter().map(|allele| allele.key.id.as_str()).collect()
}

#[test]
fn pages_slice_current_entities_in_key_order() {
    let conn = open_db_in_memory().unwrap();
    seed_alleles(&conn, 5);
    let repo = SqliteAlleleRepository::new(&conn);
    let filter = global_filter();

    let first = repo.find_all(0, 2, &filter).unwrap().unwrap();
    assert_eq!(ids(&first), vec!["1test", "2test"]);
    let second = repo.find_all(1, 2, &filter).unwrap().unwrap();
    assert_eq!(ids(&second), vec!["3test", "4test"]);
    let last = repo.find_all(2, 2, &filter).unwrap().unwrap();
    assert_eq!(ids(&last), vec!["5test"]);
}

#[test]
fn conflated_contract_returns_none_for_invalid_or_empty_pages() {
    let conn = open_db_in_memory().unwrap();
    seed_alleles(&conn, 3);
    let repo = SqliteAlleleRepository::new(&conn);
    let filter = global_filter();

    assert!(repo.find_all(-1, 2, &filter).unwrap().is_none());
    assert!(repo.find_all(0, 0, &filter).unwrap().is_none());
    assert!(repo.find_all(0, -2, &filter).unwrap().is_none());
    assert!(repo.find_all(5, 2, &filter).unwrap().is_none());
    assert!(repo.find_all_refs(5, 2, &filter).unwrap().is_none());
}

#[test]
fn split_contract_separates_invalid_paging_from_empty_pages() {
    let conn = open_db_in_memory().unwrap();
    seed_alleles(&conn, 3);
    let repo = SqliteAlleleRepository::new(&conn);
    let filter = global_filter();

    assert_eq!(PageRequest::new(-1, 2), Err(PageError::NegativePage(-1)));
    assert_eq!(PageRequest::new(0, 0), Err(PageError::NonPositiveLimit(0)));

    let beyond = repo
        .find_page(PageRequest::new(5, 2).unwrap(), &filter)
        .unwrap();
    assert!(beyond.is_empty());
    let first = repo
        .find_page(PageRequest::new(0, 2).unwrap(), &filter)
        .unwrap();
    assert_eq!(first.len(), 2);
}

#[test]
fn listings_skip_deprecated_entities_and_show_current_versions() {
    let conn = open_db_in_memory().unwrap();
    seed_alleles(&conn, 3);
    let repo = SqliteAlleleRepository::new(&conn);
    let filter = global_filter();

    repo.remove(&AlleleKey::new("t", "adk", "2test", Scope::Global))
        .unwrap();
    repo.save(&Allele::new(
        AlleleKey::new("t", "adk", "3test", Scope::Global),
        Some("TTTT".to_string()),
    ))
    .unwrap();

    let refs = repo.find_all_refs(0, 10, &filter).unwrap().unwrap();
    let summary: Vec<(&str, i64, bool)> = refs
        .iter()
        .map(|reference| (reference.key.id.as_str(), reference.version, reference.deprecated))
        .collect();
    assert_eq!(summary, vec![("1test", 1, false), ("3test", 2, false)]);
}

#[test]
fn scope_filter_separates_global_and_project_alleles() {
    let conn = open_db_in_memory().unwrap();
    seed_alleles(&conn, 2);
    let project = Project::new("typing");
    SqliteProjectRepository::new(&conn).save(&project).unwrap();
    let repo = SqliteAlleleRepository::new(&conn);
    repo.save(&Allele::new(
        AlleleKey::new("t", "adk", "9private", Scope::Project(project.id)),
        None,
    ))
    .unwrap();

    let global = repo.find_all(0, 10, &global_filter()).unwrap().unwrap();
    assert_eq!(ids(&global), vec!["1test", "2test"]);

    let scoped = AlleleFilter::new("t", "adk", Scope::Project(project.id));
    let private = repo.find_all(0, 10, &scoped).unwrap().unwrap();
    assert_eq!(ids(&private), vec!["9private"]);
}

#[test]
fn locus_listing_is_scoped_to_one_taxon() {
    let conn = open_db_in_memory().unwrap();
    let taxa = SqliteTaxonRepository::new(&conn);
    let loci = SqliteLocusRepository::new(&conn);
    taxa.save(&Taxon::new("a", None)).unwrap();
    taxa.save(&Taxon::new("b", None)).unwrap();
    loci.save(&Locus::new("a", "gyrB", None)).unwrap();
    loci.save(&Locus::new("a", "adk", None)).unwrap();
    loci.save(&Locus::new("b", "zzz", None)).unwrap();

    let listed = loci.find_all(0, 10, &LocusFilter::new("a")).unwrap().unwrap();
    let names: Vec<&str> = listed.iter().map(|locus| locus.key.id.as_str()).collect();
    assert_eq!(names, vec!["adk", "gyrB"]);
}
