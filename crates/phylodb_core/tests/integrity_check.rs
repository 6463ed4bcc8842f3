use phylodb_core::db::open_db_in_memory;
use phylodb_core::repo::SqliteTaxonRepository;
use phylodb_core::{any_missing, Taxon, VersionedRef, VersionedRepository};

#[test]
fn empty_reference_list_has_nothing_missing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaxonRepository::new(&conn);

    assert!(!any_missing(&repo, &[]).unwrap());
}

#[test]
fn live_references_pass() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaxonRepository::new(&conn);
    let first = Taxon::new("a", None);
    repo.save(&first).unwrap();
    repo.save(&Taxon::new("b", None)).unwrap();

    let refs = vec![
        Some(VersionedRef::of(&first)),
        Some(VersionedRef::current("b".to_string())),
    ];
    assert!(!any_missing(&repo, &refs).unwrap());
}

#[test]
fn unresolved_unknown_or_deleted_references_are_missing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaxonRepository::new(&conn);
    repo.save(&Taxon::new("a", None)).unwrap();
    repo.save(&Taxon::new("gone", None)).unwrap();
    repo.remove(&"gone".to_string()).unwrap();

    let live = Some(VersionedRef::current("a".to_string()));
    assert!(any_missing(&repo, &[live.clone(), None]).unwrap());
    assert!(any_missing(&repo, &[live.clone(), Some(VersionedRef::current("x".to_string()))]).unwrap());
    assert!(any_missing(&repo, &[live, Some(VersionedRef::current("gone".to_string()))]).unwrap());
}
