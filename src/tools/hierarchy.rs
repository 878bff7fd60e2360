//! Parameter definitions for the hierarchy tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateProjectParams {
    #[schemars(description = "Project name. Must be unique (case-sensitive).")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateSprintParams {
    #[schemars(description = "ID of the owning project")]
    pub project_id: String,

    #[schemars(description = "Sprint name. Must be unique within the project.")]
    pub name: String,

    #[schemars(description = "Position among sibling sprints. Omit to append after the last one.")]
    pub order: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AssignContextParams {
    #[schemars(description = "ID of the context to file")]
    pub context_id: String,

    #[schemars(description = "Target project id")]
    pub project_id: String,

    #[schemars(description = "Optional target sprint id. Must belong to project_id. Omitting it clears any previous sprint.")]
    pub sprint_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListHierarchyParams {
    #[schemars(description = "If true, also return per-project context counts")]
    pub include_counts: Option<bool>,
}
