//! MCP `add_context` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddContextParams {
    #[schemars(description = "The text content of the context (note, transcript, document text, image caption)")]
    pub content: String,

    #[schemars(description = "Context type: 'text', 'meeting', 'image' or 'document'. Defaults to 'text'.")]
    pub r#type: Option<String>,

    #[schemars(description = "Optional tags. Trimmed and deduplicated, order preserved.")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Optional project id to file the context under. Related links are searched within this project.")]
    pub project_id: Option<String>,

    #[schemars(description = "Optional sprint id. Must belong to project_id.")]
    pub sprint_id: Option<String>,
}
