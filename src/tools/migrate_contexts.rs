//! MCP `migrate_contexts` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MigrateContextsParams {
    #[schemars(description = "Classification strategy: 'tags' (project:<name> / sprint:<name> tags) or 'mapping' (explicit table in mapping_toml)")]
    pub strategy: String,

    #[schemars(
        description = "Required for strategy 'mapping': TOML with [[entry]] tables holding context_id plus project or project_id, and optionally sprint or sprint_id"
    )]
    pub mapping_toml: Option<String>,

    #[schemars(description = "If true (the default), report what would happen without writing anything")]
    pub dry_run: Option<bool>,

    #[schemars(description = "If true, recompute related links of migrated contexts within their new project")]
    pub relink: Option<bool>,
}
