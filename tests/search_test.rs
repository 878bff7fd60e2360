mod helpers;

use helpers::{embedding_with_score, test_embedding, test_store, TableEmbedder};
use tessera::error::CoreError;
use tessera::knowledge::add::add_context;
use tessera::knowledge::hierarchy::HierarchyService;
use tessera::knowledge::links::LinkConfig;
use tessera::knowledge::search::{related_contexts, search_contexts, SearchQuery};
use tessera::knowledge::types::{ContextType, NewContext};

fn embedder() -> TableEmbedder {
    TableEmbedder(vec![
        ("exact", test_embedding(5)),
        ("close", embedding_with_score(5, 0.8)),
        ("far", embedding_with_score(5, 0.1)),
        ("query", test_embedding(5)),
    ])
}

#[test]
fn search_ranks_by_similarity() {
    let store = test_store();
    let embedder = embedder();
    let cfg = LinkConfig::default();
    let far = add_context(
        &store,
        Some(&embedder),
        &cfg,
        NewContext::new(ContextType::Text, "far"),
    )
    .unwrap();
    let close = add_context(
        &store,
        Some(&embedder),
        &cfg,
        NewContext::new(ContextType::Meeting, "close"),
    )
    .unwrap();
    let exact = add_context(
        &store,
        Some(&embedder),
        &cfg,
        NewContext::new(ContextType::Text, "exact"),
    )
    .unwrap();

    let response = search_contexts(&store, Some(&embedder), &SearchQuery::new("query")).unwrap();
    assert!(!response.degraded);
    let ids: Vec<_> = response.hits.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![exact.context.id, close.context.id, far.context.id]);

    let mut filtered = SearchQuery::new("query");
    filtered.kind = Some(ContextType::Meeting);
    let response = search_contexts(&store, Some(&embedder), &filtered).unwrap();
    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.hits[0].id, close.context.id);

    let mut strict = SearchQuery::new("query");
    strict.min_score = 0.5;
    strict.limit = 1;
    let response = search_contexts(&store, Some(&embedder), &strict).unwrap();
    assert_eq!(response.total_matched, 2);
    assert_eq!(response.hits.len(), 1);
}

#[test]
fn search_scopes_to_project() {
    let store = test_store();
    let embedder = embedder();
    let cfg = LinkConfig::default();
    let project = HierarchyService::new(&store).create_project("Apollo").unwrap();

    add_context(
        &store,
        Some(&embedder),
        &cfg,
        NewContext::new(ContextType::Text, "exact"),
    )
    .unwrap();
    let inside = add_context(
        &store,
        Some(&embedder),
        &cfg,
        NewContext::new(ContextType::Text, "close").in_project(project.id),
    )
    .unwrap();

    let mut query = SearchQuery::new("query");
    query.project_id = Some(project.id);
    let response = search_contexts(&store, Some(&embedder), &query).unwrap();
    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.hits[0].id, inside.context.id);
    // Links stay inside the project as well.
    assert!(inside.context.related_links.is_empty());
}

#[test]
fn search_without_provider_is_degraded() {
    let store = test_store();
    let response = search_contexts(&store, None, &SearchQuery::new("anything")).unwrap();
    assert!(response.degraded);
    assert!(response.hits.is_empty());
    assert!(response.reason.is_some());
}

#[test]
fn empty_query_is_rejected() {
    let store = test_store();
    let err = search_contexts(&store, None, &SearchQuery::new("  ")).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn related_contexts_are_hydrated() {
    let store = test_store();
    let embedder = embedder();
    let cfg = LinkConfig::default();
    let exact = add_context(
        &store,
        Some(&embedder),
        &cfg,
        NewContext::new(ContextType::Text, "exact"),
    )
    .unwrap();
    let close = add_context(
        &store,
        Some(&embedder),
        &cfg,
        NewContext::new(ContextType::Text, "close"),
    )
    .unwrap();

    let related = related_contexts(&store, close.context.id).unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, exact.context.id);
    assert_eq!(related[0].preview, "exact");
    assert!((related[0].score - 0.8).abs() < 1e-9);

    let missing = related_contexts(&store, uuid::Uuid::now_v7()).unwrap_err();
    assert!(matches!(missing, CoreError::NotFound { .. }));
}
