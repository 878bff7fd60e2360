//! Project → Sprint hierarchy management.
//!
//! [`HierarchyService`] owns the structural invariants of the two-level tree:
//! project names are unique, sprint names are unique within their project,
//! and a context's `sprint_id` always belongs to its `project_id`. Every check
//! runs before the single storage write of an operation, so a failed call
//! leaves storage untouched.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::store::ContextStore;
use super::types::{validate_name, Project, Sprint};
use crate::error::{CoreError, CoreResult};

/// One project with its sprints, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectNode {
    #[serde(flatten)]
    pub project: Project,
    pub sprints: Vec<Sprint>,
}

/// A validated placement for a context.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub project: Project,
    pub sprint: Option<Sprint>,
}

impl ResolvedTarget {
    pub fn sprint_id(&self) -> Option<Uuid> {
        self.sprint.as_ref().map(|s| s.id)
    }
}

pub struct HierarchyService<'a> {
    store: &'a dyn ContextStore,
}

impl<'a> HierarchyService<'a> {
    pub fn new(store: &'a dyn ContextStore) -> Self {
        Self { store }
    }

    /// Create a project. Fails with [`CoreError::DuplicateName`] on an exact name match.
    pub fn create_project(&self, name: &str) -> CoreResult<Project> {
        let project = Project::new(name)?;
        if self.store.find_project_by_name(&project.name)?.is_some() {
            return Err(CoreError::DuplicateName {
                scope: "project",
                name: project.name,
            });
        }
        self.store.create_project(&project)?;
        tracing::info!(id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Create a sprint under `project_id`.
    ///
    /// Without an explicit `order` the sprint is appended after its siblings
    /// (`max(order) + 1`, or `0` for the first sprint).
    pub fn create_sprint(
        &self,
        project_id: Uuid,
        name: &str,
        order: Option<i64>,
    ) -> CoreResult<Sprint> {
        self.require_project(project_id)?;
        let name = validate_name("sprint", name)?;

        if self.store.find_sprint_by_name(project_id, &name)?.is_some() {
            return Err(CoreError::DuplicateName {
                scope: "sprint",
                name,
            });
        }

        let order = match order {
            Some(order) => order,
            None => self.next_sprint_order(project_id)?,
        };

        let sprint = Sprint::new(project_id, &name, order)?;
        self.store.create_sprint(&sprint)?;
        tracing::info!(
            id = %sprint.id,
            project_id = %project_id,
            name = %sprint.name,
            order = sprint.order,
            "sprint created"
        );
        Ok(sprint)
    }

    /// Look up a project by name, creating it on first reference.
    ///
    /// Returns the project and whether it was created by this call.
    pub fn ensure_project(&self, name: &str) -> CoreResult<(Project, bool)> {
        let name = validate_name("project", name)?;
        if let Some(existing) = self.store.find_project_by_name(&name)? {
            return Ok((existing, false));
        }
        Ok((self.create_project(&name)?, true))
    }

    /// Look up a sprint by name within a project, appending it on first reference.
    pub fn ensure_sprint(&self, project_id: Uuid, name: &str) -> CoreResult<(Sprint, bool)> {
        let name = validate_name("sprint", name)?;
        if let Some(existing) = self.store.find_sprint_by_name(project_id, &name)? {
            return Ok((existing, false));
        }
        Ok((self.create_sprint(project_id, &name, None)?, true))
    }

    pub fn get_project(&self, id: Uuid) -> CoreResult<Project> {
        self.require_project(id)
    }

    /// Validate a placement without writing anything.
    ///
    /// Fails with [`CoreError::NotFound`] if the project or sprint is missing and
    /// with [`CoreError::InvalidHierarchy`] if the sprint belongs elsewhere.
    pub fn resolve_target(
        &self,
        project_id: Uuid,
        sprint_id: Option<Uuid>,
    ) -> CoreResult<ResolvedTarget> {
        let project = self.require_project(project_id)?;
        let sprint = match sprint_id {
            None => None,
            Some(sprint_id) => {
                let sprint = self
                    .store
                    .get_sprint(sprint_id)?
                    .ok_or_else(|| CoreError::not_found("sprint", sprint_id))?;
                if sprint.project_id != project_id {
                    return Err(CoreError::InvalidHierarchy {
                        sprint_id,
                        sprint_project_id: sprint.project_id,
                        project_id,
                    });
                }
                Some(sprint)
            }
        };
        Ok(ResolvedTarget { project, sprint })
    }

    /// File a context under `project_id` (and optionally `sprint_id`).
    ///
    /// This is a full overwrite of the field pair: passing no sprint clears a
    /// previous sprint. All checks run first; on error the context is unchanged.
    pub fn assign_context(
        &self,
        context_id: Uuid,
        project_id: Uuid,
        sprint_id: Option<Uuid>,
    ) -> CoreResult<()> {
        let mut context = self
            .store
            .get_context(context_id)?
            .ok_or_else(|| CoreError::not_found("context", context_id))?;

        let target = self.resolve_target(project_id, sprint_id)?;

        if context.project_id == Some(target.project.id) && context.sprint_id == target.sprint_id() {
            tracing::debug!(id = %context_id, "context already in place");
            return Ok(());
        }

        context.project_id = Some(target.project.id);
        context.sprint_id = target.sprint_id();
        context.updated_at = Utc::now();
        self.store.save_context(&context)?;

        tracing::info!(
            id = %context_id,
            project = %target.project.name,
            sprint = ?target.sprint.as_ref().map(|s| s.name.as_str()),
            "context assigned"
        );
        Ok(())
    }

    /// All projects sorted by name, each with its sprints sorted by `order`.
    pub fn list_hierarchy(&self) -> CoreResult<Vec<ProjectNode>> {
        let mut projects = self.store.list_projects()?;
        projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let mut nodes = Vec::with_capacity(projects.len());
        for project in projects {
            let mut sprints = self.store.list_sprints(project.id)?;
            sort_sprints(&mut sprints);
            nodes.push(ProjectNode { project, sprints });
        }
        Ok(nodes)
    }

    fn require_project(&self, id: Uuid) -> CoreResult<Project> {
        self.store
            .get_project(id)?
            .ok_or_else(|| CoreError::not_found("project", id))
    }

    fn next_sprint_order(&self, project_id: Uuid) -> CoreResult<i64> {
        let siblings = self.store.list_sprints(project_id)?;
        match siblings.iter().map(|s| s.order).max() {
            None => Ok(0),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| CoreError::Validation("sprint order overflow".into())),
        }
    }
}

/// Display order for siblings: `order`, then creation time, then id.
pub fn sort_sprints(sprints: &mut [Sprint]) {
    sprints.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
