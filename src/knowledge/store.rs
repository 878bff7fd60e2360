//! Storage provider contract.
//!
//! The [`ContextStore`] trait is everything the knowledge engine needs from a
//! backend. The engine is written against this trait only; the SQLite adapter
//! in [`crate::db::store`] is injected by the composition root.
//!
//! All methods are synchronous. Callers in async contexts should use
//! `tokio::task::spawn_blocking`.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`get_context`](ContextStore::get_context) | Fetch one context by id |
//! | [`list_contexts`](ContextStore::list_contexts) | Filtered listing, oldest first |
//! | [`get_context_count`](ContextStore::get_context_count) | Count, optionally per project |
//! | [`save_context`](ContextStore::save_context) | Insert or fully overwrite a context |
//! | [`create_project`](ContextStore::create_project) / [`create_sprint`](ContextStore::create_sprint) | Insert hierarchy nodes |
//! | [`list_projects`](ContextStore::list_projects) / [`list_sprints`](ContextStore::list_sprints) | Read hierarchy nodes |
//!
//! Concurrent mutations of the same context id must be serialized by the
//! caller or the backend; the engine does no locking of its own.

use anyhow::Result;
use uuid::Uuid;

use super::types::{Context, ContextType, Project, Sprint};

/// Which contexts to include by project assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectFilter {
    #[default]
    Any,
    /// Only contexts with no project (legacy flat entries).
    Unassigned,
    /// Only contexts filed under this project.
    Project(Uuid),
}

/// Filters for [`ContextStore::list_contexts`].
///
/// Results are always ordered by `created_at` ascending, then id ascending.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub project: ProjectFilter,
    pub sprint_id: Option<Uuid>,
    pub kind: Option<ContextType>,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn in_project(project_id: Uuid) -> Self {
        Self {
            project: ProjectFilter::Project(project_id),
            ..Default::default()
        }
    }
}

/// Abstract storage backend for contexts and the hierarchy.
pub trait ContextStore: Send + Sync {
    fn get_context(&self, id: Uuid) -> Result<Option<Context>>;

    fn list_contexts(&self, options: &ListOptions) -> Result<Vec<Context>>;

    /// Number of contexts, restricted to one project when `project_id` is given.
    fn get_context_count(&self, project_id: Option<Uuid>) -> Result<u64>;

    /// Insert the context, or overwrite every field of an existing one.
    fn save_context(&self, context: &Context) -> Result<()>;

    fn create_project(&self, project: &Project) -> Result<()>;

    fn get_project(&self, id: Uuid) -> Result<Option<Project>>;

    /// Exact, case-sensitive name lookup.
    fn find_project_by_name(&self, name: &str) -> Result<Option<Project>>;

    /// All projects ordered by name.
    fn list_projects(&self) -> Result<Vec<Project>>;

    fn create_sprint(&self, sprint: &Sprint) -> Result<()>;

    fn get_sprint(&self, id: Uuid) -> Result<Option<Sprint>>;

    fn find_sprint_by_name(&self, project_id: Uuid, name: &str) -> Result<Option<Sprint>>;

    /// Sprints of one project ordered by `order`, then `created_at`.
    fn list_sprints(&self, project_id: Uuid) -> Result<Vec<Sprint>>;
}
