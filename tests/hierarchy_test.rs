mod helpers;

use helpers::{insert_legacy, test_store};
use tessera::error::CoreError;
use tessera::knowledge::hierarchy::HierarchyService;
use tessera::knowledge::store::ContextStore;
use uuid::Uuid;

#[test]
fn sprints_append_in_creation_order() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    let project = service.create_project("Apollo").unwrap();

    let s1 = service.create_sprint(project.id, "Week 1", None).unwrap();
    let s2 = service.create_sprint(project.id, "Week 2", None).unwrap();
    let s0 = service.create_sprint(project.id, "Kickoff", Some(-1)).unwrap();
    let s3 = service.create_sprint(project.id, "Week 3", None).unwrap();

    assert_eq!(s1.order, 0);
    assert_eq!(s2.order, 1);
    assert_eq!(s3.order, 2);

    let tree = service.list_hierarchy().unwrap();
    assert_eq!(tree.len(), 1);
    let order: Vec<_> = tree[0].sprints.iter().map(|s| s.id).collect();
    assert_eq!(order, vec![s0.id, s1.id, s2.id, s3.id]);
}

#[test]
fn names_are_unique_per_scope() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    let a = service.create_project("Apollo").unwrap();
    let b = service.create_project("Hermes").unwrap();

    assert!(matches!(
        service.create_project("Apollo"),
        Err(CoreError::DuplicateName { scope: "project", .. })
    ));
    // Case-sensitive.
    service.create_project("apollo").unwrap();

    service.create_sprint(a.id, "Week 1", None).unwrap();
    service.create_sprint(b.id, "Week 1", None).unwrap();
    assert!(matches!(
        service.create_sprint(a.id, "Week 1", None),
        Err(CoreError::DuplicateName { scope: "sprint", .. })
    ));
}

#[test]
fn blank_names_fail_validation() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    assert!(matches!(service.create_project("   "), Err(CoreError::Validation(_))));
    let project = service.create_project("Apollo").unwrap();
    assert!(matches!(
        service.create_sprint(project.id, "", None),
        Err(CoreError::Validation(_))
    ));
    assert!(store.list_sprints(project.id).unwrap().is_empty());
}

#[test]
fn sprint_needs_existing_project() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    let err = service.create_sprint(Uuid::now_v7(), "Week 1", None).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "project", .. }));
}

#[test]
fn assign_rejects_foreign_sprint_without_changes() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    let apollo = service.create_project("Apollo").unwrap();
    let hermes = service.create_project("Hermes").unwrap();
    let hermes_sprint = service.create_sprint(hermes.id, "Week 1", None).unwrap();
    let ctx = insert_legacy(&store, "note", &[], None, 0);

    let err = service
        .assign_context(ctx, apollo.id, Some(hermes_sprint.id))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidHierarchy { .. }));

    let unchanged = store.get_context(ctx).unwrap().unwrap();
    assert_eq!(unchanged.project_id, None);
    assert_eq!(unchanged.sprint_id, None);
}

#[test]
fn reassign_overwrites_both_fields() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    let apollo = service.create_project("Apollo").unwrap();
    let sprint = service.create_sprint(apollo.id, "Week 1", None).unwrap();
    let hermes = service.create_project("Hermes").unwrap();
    let ctx = insert_legacy(&store, "note", &[], None, 0);

    service.assign_context(ctx, apollo.id, Some(sprint.id)).unwrap();
    let placed = store.get_context(ctx).unwrap().unwrap();
    assert_eq!(placed.project_id, Some(apollo.id));
    assert_eq!(placed.sprint_id, Some(sprint.id));

    service.assign_context(ctx, hermes.id, None).unwrap();
    let moved = store.get_context(ctx).unwrap().unwrap();
    assert_eq!(moved.project_id, Some(hermes.id));
    assert_eq!(moved.sprint_id, None);
    assert!(moved.updated_at >= placed.updated_at);
}

#[test]
fn assign_missing_context_is_not_found() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    let project = service.create_project("Apollo").unwrap();
    let err = service.assign_context(Uuid::now_v7(), project.id, None).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "context", .. }));
}

#[test]
fn hierarchy_lists_projects_by_name() {
    let store = test_store();
    let service = HierarchyService::new(&store);
    for name in ["Zeus", "Apollo", "Hermes"] {
        service.create_project(name).unwrap();
    }
    let names: Vec<_> = service
        .list_hierarchy()
        .unwrap()
        .into_iter()
        .map(|node| node.project.name)
        .collect();
    assert_eq!(names, vec!["Apollo", "Hermes", "Zeus"]);
}
