use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchContextParams {
    #[schemars(description = "Natural language search query")]
    pub query: String,

    #[schemars(description = "Only search contexts filed under this project id")]
    pub project_id: Option<String>,

    #[schemars(description = "Only search contexts filed under this sprint id")]
    pub sprint_id: Option<String>,

    #[schemars(description = "Filter by type: 'text', 'meeting', 'image' or 'document'")]
    pub r#type: Option<String>,

    #[schemars(description = "Maximum number of results. Defaults to the server's search.default_limit.")]
    pub limit: Option<usize>,

    #[schemars(description = "Minimum cosine similarity for a hit, 0.0-1.0")]
    pub min_score: Option<f64>,
}
