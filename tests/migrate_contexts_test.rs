mod helpers;

use std::io::Write;

use helpers::{insert_legacy, test_embedding, test_store};
use tessera::knowledge::classify::{MappingClassifier, TagClassifier};
use tessera::knowledge::hierarchy::HierarchyService;
use tessera::knowledge::migrate::{migrate_contexts, ContextState, MigrationOptions, RunState};
use tessera::knowledge::store::{ContextStore, ListOptions, ProjectFilter};

fn write_mapping(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn mapping_file_migrates_nine_of_ten() {
    let store = test_store();
    let ids: Vec<_> = (0..10)
        .map(|i| insert_legacy(&store, &format!("note {i}"), &[], Some(test_embedding(i)), i as i64))
        .collect();

    // Nine entries point at "Apollo" / "Week 1"; the tenth names a sprint id
    // that does not exist.
    let mut body = String::new();
    for id in &ids[..9] {
        body.push_str(&format!(
            "[[entry]]\ncontext_id = \"{id}\"\nproject = \"Apollo\"\nsprint = \"Week 1\"\n\n"
        ));
    }
    let zeus = HierarchyService::new(&store).create_project("Zeus").unwrap();
    body.push_str(&format!(
        "[[entry]]\ncontext_id = \"{}\"\nproject_id = \"{}\"\nsprint_id = \"{}\"\n",
        ids[9],
        zeus.id,
        uuid::Uuid::now_v7()
    ));
    let file = write_mapping(&body);
    let classifier = MappingClassifier::load(file.path()).unwrap();
    assert_eq!(classifier.len(), 10);

    let result = migrate_contexts(&store, &classifier, &MigrationOptions::default()).unwrap();

    assert_eq!(result.migrated, 9);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].context_id, ids[9]);
    assert_eq!(result.failed[0].kind, "not_found");
    assert!(!result.dry_run);
    assert_eq!(result.state, RunState::Complete);
    assert_eq!(result.projects_created, 1);
    assert_eq!(result.sprints_created, 1);

    let apollo = store.find_project_by_name("Apollo").unwrap().unwrap();
    let week1 = store.find_sprint_by_name(apollo.id, "Week 1").unwrap().unwrap();
    for id in &ids[..9] {
        let ctx = store.get_context(*id).unwrap().unwrap();
        assert_eq!(ctx.project_id, Some(apollo.id));
        assert_eq!(ctx.sprint_id, Some(week1.id));
    }
    let failed = store.get_context(ids[9]).unwrap().unwrap();
    assert!(!failed.is_assigned());
}

#[test]
fn second_run_changes_nothing() {
    let store = test_store();
    insert_legacy(&store, "a", &["project:Apollo", "sprint:Week 1"], None, 0);
    insert_legacy(&store, "b", &["project:Apollo"], None, 1);
    insert_legacy(&store, "c", &["misc"], None, 2);
    let classifier = TagClassifier::default();

    let first = migrate_contexts(&store, &classifier, &MigrationOptions::default()).unwrap();
    assert_eq!(first.migrated, 2);
    assert_eq!(first.failed.len(), 1);
    assert_eq!(first.failed[0].kind, "unclassified");

    let before = store.list_contexts(&ListOptions::default()).unwrap();
    let second = migrate_contexts(&store, &classifier, &MigrationOptions::default()).unwrap();
    let after = store.list_contexts(&ListOptions::default()).unwrap();

    assert_eq!(second.migrated, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.failed.len(), 1);
    assert_eq!(second.projects_created, 0);
    assert_eq!(second.sprints_created, 0);
    assert_eq!(before, after);
}

#[test]
fn dry_run_reports_without_writing() {
    let store = test_store();
    insert_legacy(&store, "a", &["project:Apollo", "sprint:Week 1"], None, 0);
    insert_legacy(&store, "b", &["project:Apollo", "sprint:Week 2"], None, 1);
    insert_legacy(&store, "c", &["project:Hermes"], None, 2);

    let options = MigrationOptions {
        dry_run: true,
        ..Default::default()
    };
    let planned = migrate_contexts(&store, &TagClassifier::default(), &options).unwrap();

    assert!(planned.dry_run);
    assert_eq!(planned.migrated, 3);
    assert_eq!(planned.projects_created, 2);
    assert_eq!(planned.sprints_created, 2);
    assert!(store.list_projects().unwrap().is_empty());
    let unassigned = ListOptions {
        project: ProjectFilter::Unassigned,
        ..Default::default()
    };
    assert_eq!(store.list_contexts(&unassigned).unwrap().len(), 3);

    // The live run agrees with the plan.
    let live = migrate_contexts(
        &store,
        &TagClassifier::default(),
        &MigrationOptions::default(),
    )
    .unwrap();
    assert_eq!(live.migrated, planned.migrated);
    assert_eq!(live.projects_created, planned.projects_created);
    assert_eq!(live.sprints_created, planned.sprints_created);
}

#[test]
fn outcomes_cover_every_context_once() {
    let store = test_store();
    let ids: Vec<_> = (0..5)
        .map(|i| insert_legacy(&store, &format!("n{i}"), &["project:P"], None, i))
        .collect();
    let project = store.find_project_by_name("P").unwrap();
    assert!(project.is_none());

    let result = migrate_contexts(
        &store,
        &TagClassifier::default(),
        &MigrationOptions::default(),
    )
    .unwrap();

    let seen: Vec<_> = result.outcomes.iter().map(|o| o.context_id).collect();
    assert_eq!(seen, ids);
    assert!(result.outcomes.iter().all(|o| o.state == ContextState::Migrated));
    assert_eq!(
        result.total(),
        result.migrated + result.skipped + result.failed.len() + result.pending
    );
}

#[test]
fn malformed_mapping_file_is_rejected() {
    let file = write_mapping("[[entry]]\ncontext_id = \"not-a-uuid\"\nproject = \"A\"\n");
    assert!(MappingClassifier::load(file.path()).is_err());

    let missing = tempfile::tempdir().unwrap().path().join("absent.toml");
    assert!(MappingClassifier::load(&missing).is_err());
}
