//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! store, the embedding provider, and the MCP tool handler into a running server.

use crate::tools::TesseraTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;
use tessera::config::TesseraConfig;
use tessera::db::{self, store::SqliteStore};
use tessera::embedding::EmbeddingProvider;
use tessera::knowledge::store::ContextStore;

type SharedState = (
    Arc<dyn ContextStore>,
    Option<Arc<dyn EmbeddingProvider>>,
    Arc<TesseraConfig>,
);

/// Shared setup: open the store, create the embedding provider, check the model marker.
fn setup_shared_state(config: TesseraConfig) -> Result<SharedState> {
    let db_path = config.resolved_db_path();
    let store = SqliteStore::open(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let stored_model = store.with_connection(|conn| Ok(db::migrations::get_embedding_model(conn)?));
    if let Ok(Some(stored_model)) = stored_model {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed; new vectors will not be comparable to stored ones"
            );
        }
    }

    let embedding: Option<Arc<dyn EmbeddingProvider>> =
        crate::cli::load_provider(&config.embedding).map(Arc::from);
    match &embedding {
        Some(provider) => tracing::info!(dimensions = provider.dimensions(), "embedding provider ready"),
        None => tracing::warn!("running without embeddings: no related links, search degraded"),
    }

    let store: Arc<dyn ContextStore> = Arc::new(store);
    Ok((store, embedding, Arc::new(config)))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: TesseraConfig) -> Result<()> {
    tracing::info!("starting Tessera MCP server on stdio");

    let (store, embedding, config) =
        tokio::task::spawn_blocking(move || setup_shared_state(config)).await??;

    let tools = TesseraTools::new(store, embedding, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: TesseraConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(addr = %bind_addr, "starting Tessera MCP server on HTTP");

    let (store, embedding, config) =
        tokio::task::spawn_blocking(move || setup_shared_state(config)).await??;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(TesseraTools::new(store.clone(), embedding.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
