use phylodb_core::db::open_db_in_memory;
use phylodb_core::{
    Allele, AlleleCall, AlleleKey, Coordinate, CoreConfig, Dataset, DatasetKey, DistanceEdge,
    InferenceKey, Locus, PhylogenyService, Profile, ProfileKey, Project, Scope, Taxon,
    TypingService, Visualization, VisualizationKey, VisualizationService,
};
use rusqlite::Connection;

fn seed_run(conn: &Connection) -> InferenceKey {
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
    for id in ["A", "B"] {
        let profile = Profile::new(
            ProfileKey::new(project.id, "ds", id),
            None,
            vec![AlleleCall::new("adk", "1")],
        );
        typing.save_profile(Some(profile), false).unwrap();
    }

    let key = InferenceKey::new(project.id, "ds", "run1");
    assert!(VisualizationService::new(conn)
        .save_inference(&key, &[DistanceEdge::new("A", "B", 1)])
        .unwrap());
    key
}

fn layout(run: &InferenceKey, id: &str, coordinates: Vec<Coordinate>) -> Visualization {
    Visualization::new(
        VisualizationKey::new(run.project_id, run.dataset_id.clone(), run.id.clone(), id),
        "radial",
        coordinates,
    )
}

#[test]
fn stored_layout_round_trips_in_order() {
    let conn = open_db_in_memory().unwrap();
    let run = seed_run(&conn);
    let service = VisualizationService::new(&conn);
    let stored = layout(
        &run,
        "radial1",
        vec![Coordinate::new("B", 3.5, -1.0), Coordinate::new("A", 0.0, 0.0)],
    );

    assert!(service.save_visualization(Some(stored.clone())).unwrap());
    let loaded = service.get_visualization(&stored.key).unwrap().unwrap();
    assert_eq!(loaded, stored);
    assert_eq!(
        service.get_visualizations(&run, 0).unwrap(),
        Some(vec!["radial1".to_string()])
    );
}

#[test]
fn layouts_reject_unknown_profiles_reused_ids_and_dead_runs() {
    let conn = open_db_in_memory().unwrap();
    let run = seed_run(&conn);
    let service = VisualizationService::new(&conn);

    assert!(!service.save_visualization(None).unwrap());
    assert!(!service
        .save_visualization(Some(layout(&run, "v1", vec![Coordinate::new("Z", 0.0, 0.0)])))
        .unwrap());

    let first = layout(&run, "v1", vec![Coordinate::new("A", 0.0, 0.0)]);
    assert!(service.save_visualization(Some(first.clone())).unwrap());
    assert!(!service.save_visualization(Some(first)).unwrap());

    let other_run = InferenceKey::new(run.project_id, "ds", "missing");
    assert!(!service
        .save_visualization(Some(layout(&other_run, "v2", vec![])))
        .unwrap());
}

#[test]
fn deleted_layouts_and_layouts_of_deleted_runs_are_hidden() {
    let conn = open_db_in_memory().unwrap();
    let run = seed_run(&conn);
    let service = VisualizationService::new(&conn);
    let kept = layout(&run, "kept", vec![Coordinate::new("A", 1.0, 1.0)]);
    let dropped = layout(&run, "dropped", vec![Coordinate::new("B", 2.0, 2.0)]);
    service.save_visualization(Some(kept.clone())).unwrap();
    service.save_visualization(Some(dropped.clone())).unwrap();

    assert!(service.delete_visualization(&dropped.key).unwrap());
    assert!(!service.delete_visualization(&dropped.key).unwrap());
    assert!(service.get_visualization(&dropped.key).unwrap().is_none());
    assert_eq!(
        service.get_visualizations(&run, 0).unwrap(),
        Some(vec!["kept".to_string()])
    );

    assert!(service.delete_inference(&run).unwrap());
    assert!(service.get_visualization(&kept.key).unwrap().is_none());
    assert!(service.get_visualizations(&run, 0).unwrap().is_none());
}

#[test]
fn layout_listing_pages_by_configured_limit() {
    let conn = open_db_in_memory().unwrap();
    let run = seed_run(&conn);
    let mut config = CoreConfig::default();
    config.paging.default_limit = 1;
    let service = VisualizationService::from_config(&conn, &config);
    for id in ["b", "a"] {
        service
            .save_visualization(Some(layout(&run, id, vec![Coordinate::new("A", 0.0, 0.0)])))
            .unwrap();
    }

    assert_eq!(service.get_visualizations(&run, 0).unwrap(), Some(vec!["a".to_string()]));
    assert_eq!(service.get_visualizations(&run, 1).unwrap(), Some(vec!["b".to_string()]));
    assert!(service.get_visualizations(&run, 2).unwrap().is_none());
    assert!(service.get_visualizations(&run, -1).unwrap().is_none());
}
