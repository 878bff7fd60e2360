pub mod add_context;
pub mod hierarchy;
pub mod migrate_contexts;
pub mod search_context;

use add_context::AddContextParams;
use hierarchy::{AssignContextParams, CreateProjectParams, CreateSprintParams, ListHierarchyParams};
use migrate_contexts::MigrateContextsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_context::SearchContextParams;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use tessera::config::TesseraConfig;
use tessera::embedding::EmbeddingProvider;
use tessera::error::CoreResult;
use tessera::knowledge::classify::{Classifier, MappingClassifier, TagClassifier};
use tessera::knowledge::hierarchy::HierarchyService;
use tessera::knowledge::migrate::MigrationOptions;
use tessera::knowledge::search::SearchQuery;
use tessera::knowledge::store::ContextStore;
use tessera::knowledge::types::{ContextType, NewContext};

/// The Tessera MCP tool handler. Holds shared state (store, optional
/// embedding provider, config) and exposes the use cases via `#[tool_router]`.
#[derive(Clone)]
pub struct TesseraTools {
    tool_router: ToolRouter<Self>,
    store: Arc<dyn ContextStore>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    config: Arc<TesseraConfig>,
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|e| format!("invalid {field}: {e}"))
}

fn parse_opt_id(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, String> {
    raw.map(|r| parse_id(field, r)).transpose()
}

fn parse_kind(raw: &str) -> Result<ContextType, String> {
    raw.parse()
}

impl TesseraTools {
    /// Run a synchronous use case on the blocking pool and serialize its result.
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<String, String>
    where
        F: FnOnce(&dyn ContextStore, Option<&dyn EmbeddingProvider>) -> CoreResult<T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let embedding = self.embedding.clone();

        let value = tokio::task::spawn_blocking(move || f(&*store, embedding.as_deref()))
            .await
            .map_err(|e| format!("{op} task failed: {e}"))?
            .map_err(|e| {
                tracing::warn!(op, kind = e.kind(), error = %e, "tool call failed");
                format!("{op} failed [{}]: {e}", e.kind())
            })?;

        serde_json::to_string(&value).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_router]
impl TesseraTools {
    pub fn new(
        store: Arc<dyn ContextStore>,
        embedding: Option<Arc<dyn EmbeddingProvider>>,
        config: Arc<TesseraConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
            embedding,
            config,
        }
    }

    /// Store a new context and link it to similar ones.
    #[tool(description = "Add a context (note, meeting transcript, image caption, document). It is embedded and linked to the most similar existing contexts of the same project (or of the whole base if no project is given).")]
    async fn add_context(
        &self,
        Parameters(params): Parameters<AddContextParams>,
    ) -> Result<String, String> {
        let kind = match params.r#type.as_deref() {
            Some(raw) => parse_kind(raw)?,
            None => ContextType::Text,
        };

        let mut input = NewContext::new(kind, params.content);
        if let Some(tags) = params.tags {
            input = input.with_tags(tags);
        }
        input.project_id = parse_opt_id("project_id", params.project_id.as_deref())?;
        input.sprint_id = parse_opt_id("sprint_id", params.sprint_id.as_deref())?;

        let link_config = self
            .config
            .linking
            .link_config()
            .map_err(|e| format!("{e:#}"))?;

        tracing::info!(
            content_len = input.content.len(),
            kind = %input.kind,
            project = ?input.project_id,
            "add_context called"
        );

        self.run("add_context", move |store, embedder| {
            tessera::knowledge::add::add_context(store, embedder, &link_config, input)
        })
        .await
    }

    /// Semantic search over stored contexts.
    #[tool(description = "Search contexts by natural language query, ranked by cosine similarity. Optional project/sprint/type filters. Returns degraded=true with no hits if embeddings are unavailable.")]
    async fn search_context(
        &self,
        Parameters(params): Parameters<SearchContextParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "search_context called");

        let mut query = SearchQuery::new(params.query);
        query.project_id = parse_opt_id("project_id", params.project_id.as_deref())?;
        query.sprint_id = parse_opt_id("sprint_id", params.sprint_id.as_deref())?;
        query.kind = params.r#type.as_deref().map(parse_kind).transpose()?;
        query.limit = params.limit.unwrap_or(self.config.search.default_limit);
        query.min_score = params.min_score.unwrap_or(self.config.search.min_score);

        self.run("search_context", move |store, embedder| {
            tessera::knowledge::search::search_contexts(store, embedder, &query)
        })
        .await
    }

    /// Create a top-level project.
    #[tool(description = "Create a project. Names are unique and case-sensitive.")]
    async fn create_project(
        &self,
        Parameters(params): Parameters<CreateProjectParams>,
    ) -> Result<String, String> {
        tracing::info!(name = %params.name, "create_project called");
        self.run("create_project", move |store, _| {
            HierarchyService::new(store).create_project(&params.name)
        })
        .await
    }

    /// Create a sprint under a project.
    #[tool(description = "Create a sprint inside a project. Without an explicit order it is appended after the existing sprints.")]
    async fn create_sprint(
        &self,
        Parameters(params): Parameters<CreateSprintParams>,
    ) -> Result<String, String> {
        let project_id = parse_id("project_id", &params.project_id)?;
        tracing::info!(%project_id, name = %params.name, "create_sprint called");
        self.run("create_sprint", move |store, _| {
            HierarchyService::new(store).create_sprint(project_id, &params.name, params.order)
        })
        .await
    }

    /// File a context under a project and optional sprint.
    #[tool(description = "Assign a context to a project and optionally a sprint of that project. Replaces any previous assignment; fails without changes if the sprint belongs to another project.")]
    async fn assign_context(
        &self,
        Parameters(params): Parameters<AssignContextParams>,
    ) -> Result<String, String> {
        let context_id = parse_id("context_id", &params.context_id)?;
        let project_id = parse_id("project_id", &params.project_id)?;
        let sprint_id = parse_opt_id("sprint_id", params.sprint_id.as_deref())?;
        tracing::info!(%context_id, %project_id, ?sprint_id, "assign_context called");

        self.run("assign_context", move |store, _| {
            HierarchyService::new(store).assign_context(context_id, project_id, sprint_id)?;
            Ok(serde_json::json!({
                "context_id": context_id,
                "project_id": project_id,
                "sprint_id": sprint_id,
                "status": "assigned"
            }))
        })
        .await
    }

    /// List projects with their sprints.
    #[tool(description = "List all projects (by name) with their sprints (by order). Optionally include per-project context counts.")]
    async fn list_hierarchy(
        &self,
        Parameters(params): Parameters<ListHierarchyParams>,
    ) -> Result<String, String> {
        let include_counts = params.include_counts.unwrap_or(false);
        self.run("list_hierarchy", move |store, _| {
            let projects = HierarchyService::new(store).list_hierarchy()?;
            if !include_counts {
                return Ok(serde_json::json!({ "projects": projects }));
            }
            let stats = tessera::knowledge::stats::knowledge_stats(store)?;
            Ok(serde_json::json!({ "projects": projects, "stats": stats }))
        })
        .await
    }

    /// Move unassigned contexts into the hierarchy.
    #[tool(description = "Migrate unassigned (flat) contexts into the project/sprint hierarchy using a tag or mapping strategy. Defaults to a dry run. Idempotent: already-assigned contexts are skipped; per-context failures are reported, not fatal.")]
    async fn migrate_contexts(
        &self,
        Parameters(params): Parameters<MigrateContextsParams>,
    ) -> Result<String, String> {
        let classifier: Box<dyn Classifier> = match params.strategy.as_str() {
            "tags" => Box::new(TagClassifier::default()),
            "mapping" => {
                let raw = params
                    .mapping_toml
                    .as_deref()
                    .ok_or("strategy 'mapping' requires mapping_toml")?;
                Box::new(MappingClassifier::from_toml_str(raw).map_err(|e| format!("{e:#}"))?)
            }
            other => return Err(format!("unknown strategy: {other}. Supported: tags, mapping")),
        };

        let options = MigrationOptions {
            dry_run: params.dry_run.unwrap_or(true),
            relink: params.relink.unwrap_or(false),
            link_config: self
                .config
                .linking
                .link_config()
                .map_err(|e| format!("{e:#}"))?,
            cancel: None,
        };
        tracing::info!(strategy = %params.strategy, dry_run = options.dry_run, "migrate_contexts called");

        self.run("migrate_contexts", move |store, _| {
            tessera::knowledge::migrate::migrate_contexts(store, classifier.as_ref(), &options)
        })
        .await
    }
}

#[tool_handler]
impl ServerHandler for TesseraTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Tessera is a personal knowledge base. Use add_context to save notes, \
                 search_context to find them, and create_project / create_sprint / \
                 assign_context / list_hierarchy to organize them. migrate_contexts files \
                 legacy unassigned contexts."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
