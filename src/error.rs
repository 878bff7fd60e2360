//! Typed error taxonomy for the knowledge engine.
//!
//! Structural violations ([`CoreError::NotFound`], [`CoreError::DuplicateName`],
//! [`CoreError::InvalidHierarchy`]) abort only the operation that raised them.
//! [`CoreError::EmbeddingUnavailable`] is never propagated out of the add/search
//! paths; callers log it and continue without a vector.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the `knowledge` module.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced Project, Sprint, or Context does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A name collides with an existing sibling in the same scope.
    #[error("duplicate {scope} name: {name}")]
    DuplicateName { scope: &'static str, name: String },

    /// A sprint was paired with a project it does not belong to.
    #[error(
        "invalid hierarchy: sprint {sprint_id} belongs to project {sprint_project_id}, not {project_id}"
    )]
    InvalidHierarchy {
        sprint_id: Uuid,
        sprint_project_id: Uuid,
        project_id: Uuid,
    },

    /// Input failed a constructor-time check (empty name, out-of-range threshold, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The embedding provider is missing or failed.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The migration classifier produced no target for a context.
    #[error("no classification target for context {context_id}")]
    Unclassified { context_id: Uuid },

    /// The storage provider failed.
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short machine-friendly kind, used in migration reports and MCP responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::InvalidHierarchy { .. } => "invalid_hierarchy",
            Self::Validation(_) => "validation",
            Self::EmbeddingUnavailable(_) => "embedding_unavailable",
            Self::Unclassified { .. } => "unclassified",
            Self::Storage(_) => "storage",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
