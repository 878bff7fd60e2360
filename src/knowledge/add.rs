//! Write path: embed, link and save a new context.
//!
//! [`add_context`] is the single entry point for new entries. The hierarchy
//! placement is validated before anything is written, and an unavailable
//! embedding provider only costs the new entry its vector and links.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::hierarchy::HierarchyService;
use super::links::{build_links, LinkCandidate, LinkConfig};
use super::store::{ContextStore, ListOptions};
use super::types::{Context, NewContext};
use crate::embedding::{embed_optional, EmbeddingProvider};
use crate::error::CoreResult;

/// Result returned from an add operation.
#[derive(Debug, Serialize)]
pub struct AddContextResult {
    pub context: Context,
    /// `true` if the entry was stored without an embedding.
    pub degraded: bool,
}

/// Full write path: validate → resolve placement → embed → link → save.
///
/// The candidate pool is every embedded context of the same project, or the
/// whole corpus when no project is given.
pub fn add_context(
    store: &dyn ContextStore,
    embedder: Option<&dyn EmbeddingProvider>,
    link_config: &LinkConfig,
    input: NewContext,
) -> CoreResult<AddContextResult> {
    // 1. Storage-free checks
    input.validate()?;

    // 2. Placement (read-only)
    let target = match input.project_id {
        Some(project_id) => {
            Some(HierarchyService::new(store).resolve_target(project_id, input.sprint_id)?)
        }
        None => None,
    };

    // 3. Embedding, degrading to none
    let embedding = embed_optional(embedder, &input.content);

    // 4. Related links
    let pool_options = match input.project_id {
        Some(project_id) => ListOptions::in_project(project_id),
        None => ListOptions::default(),
    };
    let related_links = match embedding.as_deref() {
        Some(vector) => {
            let pool = store.list_contexts(&pool_options)?;
            let candidates: Vec<LinkCandidate> =
                pool.iter().filter_map(LinkCandidate::from_context).collect();
            build_links(Some(vector), &candidates, link_config)
        }
        None => Vec::new(),
    };

    // 5. Save
    let now = Utc::now();
    let context = Context {
        id: Uuid::now_v7(),
        kind: input.kind,
        content: input.content,
        embedding,
        tags: input.tags,
        project_id: target.as_ref().map(|t| t.project.id),
        sprint_id: target.as_ref().and_then(|t| t.sprint_id()),
        related_links,
        created_at: now,
        updated_at: now,
    };
    store.save_context(&context)?;

    tracing::info!(
        id = %context.id,
        kind = %context.kind,
        links = context.related_links.len(),
        embedded = context.embedding.is_some(),
        "context added"
    );

    let degraded = context.embedding.is_none();
    Ok(AddContextResult { context, degraded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::SqliteStore;
    use crate::error::CoreError;
    use crate::knowledge::types::ContextType;

    /// Maps known words to fixed 3-d vectors; fails on "boom".
    struct KeywordEmbedder;

    impl EmbeddingProvider for KeywordEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f64>> {
            if text.contains("boom") {
                anyhow::bail!("model crashed");
            }
            Ok(if text.contains("rust") {
                vec![1.0, 0.1, 0.0]
            } else if text.contains("cargo") {
                vec![0.9, 0.2, 0.0]
            } else {
                vec![0.0, 0.0, 1.0]
            })
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    #[test]
    fn links_to_similar_predecessors() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cfg = LinkConfig::default();
        let first = add_context(
            &store,
            Some(&KeywordEmbedder),
            &cfg,
            NewContext::new(ContextType::Text, "rust ownership"),
        )
        .unwrap();
        add_context(
            &store,
            Some(&KeywordEmbedder),
            &cfg,
            NewContext::new(ContextType::Text, "gardening"),
        )
        .unwrap();

        let third = add_context(
            &store,
            Some(&KeywordEmbedder),
            &cfg,
            NewContext::new(ContextType::Text, "cargo workspaces"),
        )
        .unwrap();
        assert!(!third.degraded);
        assert_eq!(third.context.related_links.len(), 1);
        assert_eq!(third.context.related_links[0].target_id, first.context.id);

        // Links are not added retroactively to the older entry.
        let reloaded = store.get_context(first.context.id).unwrap().unwrap();
        assert!(reloaded.related_links.is_empty());
    }

    #[test]
    fn embedding_failure_degrades_gracefully() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = add_context(
            &store,
            Some(&KeywordEmbedder),
            &LinkConfig::default(),
            NewContext::new(ContextType::Meeting, "boom"),
        )
        .unwrap();
        assert!(result.degraded);
        assert!(result.context.embedding.is_none());
        assert!(result.context.related_links.is_empty());
        assert!(store.get_context(result.context.id).unwrap().is_some());
    }

    #[test]
    fn pool_is_scoped_to_project() {
        let store = SqliteStore::open_in_memory().unwrap();
        let svc = HierarchyService::new(&store);
        let p = svc.create_project("P").unwrap();
        let cfg = LinkConfig::default();

        add_context(
            &store,
            Some(&KeywordEmbedder),
            &cfg,
            NewContext::new(ContextType::Text, "rust outside"),
        )
        .unwrap();
        let inside = add_context(
            &store,
            Some(&KeywordEmbedder),
            &cfg,
            NewContext::new(ContextType::Text, "rust inside").in_project(p.id),
        )
        .unwrap();
        assert!(inside.context.related_links.is_empty());

        let second = add_context(
            &store,
            Some(&KeywordEmbedder),
            &cfg,
            NewContext::new(ContextType::Text, "cargo inside").in_project(p.id),
        )
        .unwrap();
        assert_eq!(second.context.related_links.len(), 1);
        assert_eq!(second.context.related_links[0].target_id, inside.context.id);
    }

    #[test]
    fn invalid_placement_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let svc = HierarchyService::new(&store);
        let a = svc.create_project("A").unwrap();
        let b = svc.create_project("B").unwrap();
        let sb = svc.create_sprint(b.id, "S", None).unwrap();

        let err = add_context(
            &store,
            None,
            &LinkConfig::default(),
            NewContext::new(ContextType::Text, "x").in_project(a.id).in_sprint(sb.id),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidHierarchy { .. }));
        assert_eq!(store.get_context_count(None).unwrap(), 0);
    }
}
