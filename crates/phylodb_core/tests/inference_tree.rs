use phylodb_core::db::open_db_in_memory;
use phylodb_core::{
    Allele, AlleleCall, AlleleKey, CoreConfig, Dataset, DatasetKey, DistanceEdge, InferenceKey,
    Locus, PhylogenyService, Profile, ProfileKey, Project, Scope, ServiceError, Taxon, TreeError,
    TypingService, VisualizationService,
};
use rusqlite::Connection;

fn seed_profiles(conn: &Connection, ids: &[&str]) -> DatasetKey {
    let phylogeny = PhylogenyService::new(conn);
    phylogeny.save_taxon(Some(Taxon::new("t", None))).unwrap();
    phylogeny
        .save_locus(Some(Locus::new("t", "adk", None)))
        .unwrap();
    phylogeny
        .save_allele(Some(Allele::new(
            AlleleKey::new("t", "adk", "1", Scope::Global),
            None,
        )))
        .unwrap();

    let typing = TypingService::new(conn);
    let project = Project::new("typing");
    typing.save_project(Some(project.clone())).unwrap();
    let dataset = DatasetKey::new(project.id, "ds");
    typing
        .save_dataset(Some(Dataset::new(dataset.clone(), "t", None)))
        .unwrap();
    for id in ids {
        let profile = Profile::new(
            ProfileKey::new(project.id, "ds", *id),
            None,
            vec![AlleleCall::new("adk", "1")],
        );
        assert!(typing.save_profile(Some(profile), false).unwrap());
    }
    dataset
}

fn inference(dataset: &DatasetKey, id: &str) -> InferenceKey {
    InferenceKey::new(dataset.project_id, dataset.id.clone(), id)
}

#[test]
fn stored_edges_rebuild_the_forest() {
    let conn = open_db_in_memory().unwrap();
    let dataset = seed_profiles(&conn, &["A", "B", "C", "D"]);
    let service = VisualizationService::new(&conn);
    let key = inference(&dataset, "goeburst");
    let edges = vec![
        DistanceEdge::new("A", "B", 1),
        DistanceEdge::new("A", "C", 2),
        DistanceEdge::new("B", "D", 1),
    ];

    assert!(service.save_inference(&key, &edges).unwrap());
    let tree = service.tree(&key).unwrap().unwrap();

    assert_eq!(tree.roots.len(), 1);
    let root = &tree.roots[0];
    assert_eq!(root.id, "A");
    assert_eq!(root.children[0].id, "B");
    assert_eq!(root.children[1].distance, 2);
    assert_eq!(root.children[0].children[0].id, "D");
    assert_eq!(service.get_inferences(&dataset).unwrap(), vec!["goeburst"]);
}

#[test]
fn inference_requires_live_profiles_and_a_fresh_id() {
    let conn = open_db_in_memory().unwrap();
    let dataset = seed_profiles(&conn, &["A", "B"]);
    let service = VisualizationService::new(&conn);
    let key = inference(&dataset, "run1");

    assert!(!service
        .save_inference(&key, &[DistanceEdge::new("A", "Z", 1)])
        .unwrap());
    assert!(service.tree(&key).unwrap().is_none());

    assert!(service
        .save_inference(&key, &[DistanceEdge::new("A", "B", 1)])
        .unwrap());
    assert!(!service
        .save_inference(&key, &[DistanceEdge::new("B", "A", 1)])
        .unwrap());
}

#[test]
fn duplicate_edges_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let dataset = seed_profiles(&conn, &["A", "B"]);
    let service = VisualizationService::new(&conn);

    let edges = [DistanceEdge::new("A", "B", 1), DistanceEdge::new("A", "B", 2)];
    assert!(!service
        .save_inference(&inference(&dataset, "dup"), &edges)
        .unwrap());
}

#[test]
fn deleted_inference_has_no_tree() {
    let conn = open_db_in_memory().unwrap();
    let dataset = seed_profiles(&conn, &["A", "B"]);
    let service = VisualizationService::new(&conn);
    let key = inference(&dataset, "run1");
    service
        .save_inference(&key, &[DistanceEdge::new("A", "B", 1)])
        .unwrap();

    assert!(service.delete_inference(&key).unwrap());
    assert!(service.tree(&key).unwrap().is_none());
    assert!(!service.delete_inference(&key).unwrap());
    assert!(service.get_inferences(&dataset).unwrap().is_empty());
}

#[test]
fn malformed_stored_edges_surface_as_tree_errors() {
    let conn = open_db_in_memory().unwrap();
    let dataset = seed_profiles(&conn, &["A", "B", "C"]);
    let service = VisualizationService::new(&conn);
    let key = inference(&dataset, "shared");
    service
        .save_inference(
            &key,
            &[DistanceEdge::new("A", "C", 1), DistanceEdge::new("B", "C", 1)],
        )
        .unwrap();

    let err = service.tree(&key).unwrap_err();
    assert!(matches!(err, ServiceError::Tree(TreeError::MalformedInput(_))));
}

#[test]
fn configured_depth_cap_applies_to_stored_trees() {
    let conn = open_db_in_memory().unwrap();
    let dataset = seed_profiles(&conn, &["A", "B", "C"]);
    let mut config = CoreConfig::default();
    config.visualization.max_tree_depth = 1;
    let service = VisualizationService::from_config(&conn, &config);
    let key = inference(&dataset, "deep");
    service
        .save_inference(
            &key,
            &[DistanceEdge::new("A", "B", 1), DistanceEdge::new("B", "C", 1)],
        )
        .unwrap();

    let err = service.tree(&key).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Tree(TreeError::DepthExceeded { limit: 1 })
    ));
}

#[test]
fn tree_serializes_as_nested_json() {
    let conn = open_db_in_memory().unwrap();
    let dataset = seed_profiles(&conn, &["A", "B"]);
    let service = VisualizationService::new(&conn);
    let key = inference(&dataset, "json");
    service
        .save_inference(&key, &[DistanceEdge::new("A", "B", 4)])
        .unwrap();

    let tree = service.tree(&key).unwrap().unwrap();
    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "roots": [{
                "id": "A",
                "distance": 0,
                "children": [{ "id": "B", "distance": 4, "children": [] }]
            }]
        })
    );
}
