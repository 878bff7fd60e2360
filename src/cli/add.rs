use std::sync::Arc;

use anyhow::Result;

use tessera::config::TesseraConfig;
use tessera::embedding::EmbeddingProvider;
use tessera::knowledge::add::add_context;
use tessera::knowledge::types::{ContextType, NewContext};

use super::hierarchy::{resolve_project, resolve_sprint};

pub struct AddArgs {
    pub content: String,
    pub kind: String,
    pub tags: Vec<String>,
    pub project: Option<String>,
    pub sprint: Option<String>,
}

/// Add a context from the terminal and print its links.
pub async fn add(config: &TesseraConfig, args: AddArgs) -> Result<()> {
    let kind: ContextType = args.kind.parse().map_err(anyhow::Error::msg)?;
    let store = Arc::new(super::open_store(config)?);

    let mut input = NewContext::new(kind, args.content).with_tags(&args.tags);
    if let Some(project) = &args.project {
        let project = resolve_project(&*store, project)?;
        if let Some(sprint) = &args.sprint {
            input = input.in_sprint(resolve_sprint(&*store, project.id, sprint)?.id);
        }
        input = input.in_project(project.id);
    }

    let embedding_config = config.embedding.clone();
    let link_config = config.linking.link_config()?;
    let store_for_add = Arc::clone(&store);

    // Model load and inference are CPU-heavy.
    let result = tokio::task::spawn_blocking(move || -> Result<_> {
        let provider = super::load_provider(&embedding_config);
        let embedder: Option<&dyn EmbeddingProvider> = provider.as_deref();
        Ok(add_context(&*store_for_add, embedder, &link_config, input)?)
    })
    .await??;

    let ctx = &result.context;
    println!("Added {} [{}]", ctx.id, ctx.kind);
    if result.degraded {
        println!("  (stored without embedding; no related links computed)");
    } else if ctx.related_links.is_empty() {
        println!("  No related contexts above threshold {}", config.linking.threshold);
    } else {
        println!("  Related:");
        for link in &ctx.related_links {
            println!("    {} (score: {:.4})", link.target_id, link.score);
        }
    }
    Ok(())
}
