use serde::Serialize;
use uuid::Uuid;

use super::hierarchy::HierarchyService;
use super::store::{ContextStore, ListOptions};
use crate::error::CoreResult;

/// Response from knowledge_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_contexts: u64,
    pub unassigned_contexts: u64,
    pub embedded_contexts: u64,
    pub projects: Vec<ProjectStats>,
}

#[derive(Debug, Serialize)]
pub struct ProjectStats {
    pub id: Uuid,
    pub name: String,
    pub contexts: u64,
    pub sprints: usize,
}

/// Corpus counts, overall and per project (projects in name order).
pub fn knowledge_stats(store: &dyn ContextStore) -> CoreResult<StatsResponse> {
    let total_contexts = store.get_context_count(None)?;
    let embedded_contexts = store
        .list_contexts(&ListOptions::default())?
        .iter()
        .filter(|c| c.embedding.is_some())
        .count() as u64;

    let mut projects = Vec::new();
    for node in HierarchyService::new(store).list_hierarchy()? {
        projects.push(ProjectStats {
            contexts: store.get_context_count(Some(node.project.id))?,
            id: node.project.id,
            name: node.project.name,
            sprints: node.sprints.len(),
        });
    }

    let assigned: u64 = projects.iter().map(|p| p.contexts).sum();

    Ok(StatsResponse {
        total_contexts,
        unassigned_contexts: total_contexts.saturating_sub(assigned),
        embedded_contexts,
        projects,
    })
}
