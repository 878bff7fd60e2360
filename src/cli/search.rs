use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use tessera::config::TesseraConfig;
use tessera::embedding::EmbeddingProvider;
use tessera::knowledge::search::{related_contexts, search_contexts, SearchQuery};
use tessera::knowledge::types::ContextType;

use super::hierarchy::resolve_project;

/// Run a semantic search from the terminal.
pub async fn search(
    config: &TesseraConfig,
    query: &str,
    project: Option<&str>,
    kind: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let store = Arc::new(super::open_store(config)?);

    let mut search_query = SearchQuery::new(query);
    search_query.limit = limit.unwrap_or(config.search.default_limit);
    search_query.min_score = config.search.min_score;
    search_query.kind = kind
        .map(|k| k.parse::<ContextType>().map_err(anyhow::Error::msg))
        .transpose()?;
    if let Some(project) = project {
        search_query.project_id = Some(resolve_project(&*store, project)?.id);
    }

    let embedding_config = config.embedding.clone();
    let response = tokio::task::spawn_blocking(move || -> Result<_> {
        let provider = super::load_provider(&embedding_config);
        let embedder: Option<&dyn EmbeddingProvider> = provider.as_deref();
        Ok(search_contexts(&*store, embedder, &search_query)?)
    })
    .await??;

    if response.degraded {
        println!(
            "Search unavailable: {}",
            response.reason.as_deref().unwrap_or("no embedding provider")
        );
        println!("Run `tessera model download` to enable semantic search.");
        return Ok(());
    }

    if response.hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!(
        "Found {} result(s), showing {}\n",
        response.total_matched,
        response.hits.len()
    );

    for (i, hit) in response.hits.iter().enumerate() {
        let preview: String = hit.content.chars().take(120).collect();
        let ellipsis = if hit.content.chars().count() > 120 { "..." } else { "" };

        println!("  {}. [{}] {} (score: {:.4})", i + 1, hit.kind, hit.id, hit.score);
        println!("     {preview}{ellipsis}");
        println!();
    }

    Ok(())
}

/// Print the stored related links of one context.
pub fn related(config: &TesseraConfig, id: &str) -> Result<()> {
    let id = Uuid::parse_str(id).with_context(|| format!("invalid context id: {id}"))?;
    let store = super::open_store(config)?;
    let related = related_contexts(&store, id)?;

    if related.is_empty() {
        println!("No related contexts for {id}.");
        return Ok(());
    }

    for link in &related {
        println!("  {:.4}  [{}] {}  {}", link.score, link.kind, link.id, link.preview);
    }
    Ok(())
}
