mod cli;
mod server;
mod tools;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tessera::config;

#[derive(Parser)]
#[command(name = "tessera", version, about = "Personal knowledge base with linked contexts and a project/sprint hierarchy")]
struct Cli {
    /// Config file (defaults to ~/.tessera/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport, or HTTP with --http)
    Serve {
        /// Serve Streamable HTTP on server.host:server.port instead of stdio
        #[arg(long)]
        http: bool,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Add a context
    Add {
        content: String,
        /// text, meeting, image or document
        #[arg(long = "type", default_value = "text")]
        kind: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Project name or id
        #[arg(long)]
        project: Option<String>,
        /// Sprint name or id (requires --project)
        #[arg(long, requires = "project")]
        sprint: Option<String>,
    },
    /// Semantic search over stored contexts
    Search {
        query: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the related links of a context
    Related { id: String },
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Manage sprints
    Sprint {
        #[command(subcommand)]
        action: SprintAction,
    },
    /// File a context under a project (and optionally a sprint)
    Assign {
        context_id: String,
        /// Project name or id
        project: String,
        /// Sprint name or id
        #[arg(long)]
        sprint: Option<String>,
    },
    /// Print the project/sprint tree
    Tree,
    /// Move unassigned contexts into the hierarchy
    #[command(group(ArgGroup::new("strategy").required(true).args(["mapping", "tags"])))]
    Migrate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
        /// TOML mapping file with [[entry]] tables
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Classify by project:<name> / sprint:<name> tags
        #[arg(long)]
        tags: bool,
        #[arg(long, default_value = "project:")]
        project_prefix: String,
        #[arg(long, default_value = "sprint:")]
        sprint_prefix: String,
        /// Recompute related links within each context's new project
        #[arg(long)]
        relink: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show knowledge base statistics
    Stats,
    /// Run database diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.tessera/models/
    Download,
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project
    Create { name: String },
}

#[derive(Subcommand)]
enum SprintAction {
    /// Create a sprint, appended after its siblings unless --order is given
    Create {
        /// Project name or id
        project: String,
        name: String,
        #[arg(long)]
        order: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::TesseraConfig::load_from(path)?,
        None => config::TesseraConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC and command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http || config.server.transport == "http" {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
        Command::Add {
            content,
            kind,
            tags,
            project,
            sprint,
        } => {
            let args = cli::add::AddArgs {
                content,
                kind,
                tags,
                project,
                sprint,
            };
            cli::add::add(&config, args).await?;
        }
        Command::Search {
            query,
            project,
            kind,
            limit,
        } => {
            cli::search::search(&config, &query, project.as_deref(), kind.as_deref(), limit).await?;
        }
        Command::Related { id } => cli::search::related(&config, &id)?,
        Command::Project { action } => match action {
            ProjectAction::Create { name } => cli::hierarchy::create_project(&config, &name)?,
        },
        Command::Sprint { action } => match action {
            SprintAction::Create {
                project,
                name,
                order,
            } => cli::hierarchy::create_sprint(&config, &project, &name, order)?,
        },
        Command::Assign {
            context_id,
            project,
            sprint,
        } => cli::hierarchy::assign(&config, &context_id, &project, sprint.as_deref())?,
        Command::Tree => cli::hierarchy::tree(&config)?,
        Command::Migrate {
            dry_run,
            mapping,
            tags: _,
            project_prefix,
            sprint_prefix,
            relink,
            json,
        } => {
            let strategy = match mapping {
                Some(path) => cli::migrate::Strategy::Mapping(path),
                None => cli::migrate::Strategy::Tags {
                    project_prefix,
                    sprint_prefix,
                },
            };
            let args = cli::migrate::MigrateArgs {
                strategy,
                dry_run,
                relink,
                json,
            };
            cli::migrate::migrate(&config, args).await?;
        }
        Command::Stats => cli::stats::stats(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
