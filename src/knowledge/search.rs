//! Read path: semantic search and related-context hydration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::store::{ContextStore, ListOptions, ProjectFilter};
use super::types::{Context, ContextType, Tags};
use super::vector::checked_similarity;
use crate::embedding::{try_embed, EmbeddingProvider};
use crate::error::{CoreError, CoreResult};

const PREVIEW_CHARS: usize = 120;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub project_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
    pub kind: Option<ContextType>,
    pub limit: usize,
    /// Hits scoring below this are dropped.
    pub min_score: f64,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            project_id: None,
            sprint_id: None,
            kind: None,
            limit: 10,
            min_score: 0.0,
        }
    }
}

/// A single ranked hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContextType,
    pub content: String,
    pub score: f64,
    pub tags: Tags,
    pub project_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    /// Hits above `min_score` before `limit` was applied.
    pub total_matched: usize,
    /// `true` when no query embedding could be computed.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One hydrated related link.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedContext {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContextType,
    pub preview: String,
    pub score: f64,
    pub project_id: Option<Uuid>,
}

// ── Use cases ────────────────────────────────────────────────────────────────

/// Rank stored contexts by cosine similarity to `query.text`.
///
/// Contexts without an embedding, or with one of a different length, are
/// never scored. Ties rank the newer context first. If no query embedding is
/// available the response is empty and flagged `degraded`.
pub fn search_contexts(
    store: &dyn ContextStore,
    embedder: Option<&dyn EmbeddingProvider>,
    query: &SearchQuery,
) -> CoreResult<SearchResponse> {
    if query.text.trim().is_empty() {
        return Err(CoreError::Validation("query must not be empty".into()));
    }
    if query.limit == 0 {
        return Err(CoreError::Validation("limit must be at least 1".into()));
    }

    let vector = match try_embed(embedder, &query.text) {
        Ok(vector) => vector,
        Err(e) => {
            tracing::warn!(error = %e, "search degraded: no query embedding");
            return Ok(SearchResponse {
                hits: Vec::new(),
                total_matched: 0,
                degraded: true,
                reason: Some(e.to_string()),
            });
        }
    };

    let options = ListOptions {
        project: query.project_id.map_or(ProjectFilter::Any, ProjectFilter::Project),
        sprint_id: query.sprint_id,
        kind: query.kind,
        limit: None,
    };
    let pool = store.list_contexts(&options)?;

    let mut scored: Vec<(f64, Context)> = pool
        .into_iter()
        .filter_map(|ctx| {
            let score = checked_similarity(&vector, ctx.embedding.as_deref()?)?;
            (score >= query.min_score).then_some((score, ctx))
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.total_cmp(sa)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total_matched = scored.len();
    scored.truncate(query.limit);

    let hits = scored
        .into_iter()
        .map(|(score, ctx)| SearchHit {
            id: ctx.id,
            kind: ctx.kind,
            content: ctx.content,
            score,
            tags: ctx.tags,
            project_id: ctx.project_id,
            sprint_id: ctx.sprint_id,
            created_at: ctx.created_at,
        })
        .collect::<Vec<_>>();

    tracing::debug!(query = %query.text, hits = hits.len(), total_matched, "search complete");

    Ok(SearchResponse {
        hits,
        total_matched,
        degraded: false,
        reason: None,
    })
}

/// Resolve a context's stored links into previews, in stored rank order.
///
/// Links whose target no longer exists are dropped.
pub fn related_contexts(store: &dyn ContextStore, id: Uuid) -> CoreResult<Vec<RelatedContext>> {
    let context = store
        .get_context(id)?
        .ok_or_else(|| CoreError::not_found("context", id))?;

    let mut related = Vec::with_capacity(context.related_links.len());
    for link in &context.related_links {
        match store.get_context(link.target_id)? {
            Some(target) => related.push(RelatedContext {
                id: target.id,
                kind: target.kind,
                preview: target.preview(PREVIEW_CHARS),
                score: link.score,
                project_id: target.project_id,
            }),
            None => tracing::debug!(source = %id, target = %link.target_id, "dangling related link"),
        }
    }

    Ok(related)
}
