//! CLI `project`, `sprint`, `assign` and `tree` commands.

use anyhow::{Context, Result};
use uuid::Uuid;

use tessera::config::TesseraConfig;
use tessera::error::CoreError;
use tessera::knowledge::hierarchy::HierarchyService;
use tessera::knowledge::store::ContextStore;
use tessera::knowledge::types::{Project, Sprint};

/// Accept either a project id or an exact project name.
pub fn resolve_project(store: &dyn ContextStore, name_or_id: &str) -> Result<Project> {
    if let Ok(id) = Uuid::parse_str(name_or_id) {
        if let Some(project) = store.get_project(id)? {
            return Ok(project);
        }
    }
    store
        .find_project_by_name(name_or_id.trim())?
        .ok_or_else(|| CoreError::not_found("project", name_or_id).into())
}

/// Accept either a sprint id or a sprint name within `project_id`.
///
/// An id is returned even if it belongs to another project, so the caller's
/// hierarchy check reports the mismatch.
pub fn resolve_sprint(store: &dyn ContextStore, project_id: Uuid, name_or_id: &str) -> Result<Sprint> {
    if let Ok(id) = Uuid::parse_str(name_or_id) {
        if let Some(sprint) = store.get_sprint(id)? {
            return Ok(sprint);
        }
    }
    store
        .find_sprint_by_name(project_id, name_or_id.trim())?
        .ok_or_else(|| CoreError::not_found("sprint", name_or_id).into())
}

pub fn create_project(config: &TesseraConfig, name: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let project = HierarchyService::new(&store).create_project(name)?;
    println!("Created project {} ({})", project.name, project.id);
    Ok(())
}

pub fn create_sprint(config: &TesseraConfig, project: &str, name: &str, order: Option<i64>) -> Result<()> {
    let store = super::open_store(config)?;
    let project = resolve_project(&store, project)?;
    let sprint = HierarchyService::new(&store).create_sprint(project.id, name, order)?;
    println!(
        "Created sprint {} in {} (order {}, id {})",
        sprint.name, project.name, sprint.order, sprint.id
    );
    Ok(())
}

pub fn assign(config: &TesseraConfig, context_id: &str, project: &str, sprint: Option<&str>) -> Result<()> {
    let context_id = Uuid::parse_str(context_id)
        .with_context(|| format!("invalid context id: {context_id}"))?;
    let store = super::open_store(config)?;

    let project = resolve_project(&store, project)?;
    let sprint = sprint
        .map(|s| resolve_sprint(&store, project.id, s))
        .transpose()?;

    HierarchyService::new(&store).assign_context(context_id, project.id, sprint.as_ref().map(|s| s.id))?;

    match sprint {
        Some(sprint) => println!("Assigned {context_id} to {} / {}", project.name, sprint.name),
        None => println!("Assigned {context_id} to {}", project.name),
    }
    Ok(())
}

/// Print every project with its sprints and context counts.
pub fn tree(config: &TesseraConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let nodes = HierarchyService::new(&store).list_hierarchy()?;

    if nodes.is_empty() {
        println!("No projects yet. Create one with `tessera project create <name>`.");
        return Ok(());
    }

    let mut assigned = 0;
    for node in &nodes {
        let count = store.get_context_count(Some(node.project.id))?;
        assigned += count;
        println!("{} ({count} contexts)", node.project.name);
        for (i, sprint) in node.sprints.iter().enumerate() {
            let branch = if i + 1 == node.sprints.len() { "└─" } else { "├─" };
            println!("  {branch} {} [order {}]", sprint.name, sprint.order);
        }
    }

    let unassigned = store.get_context_count(None)?.saturating_sub(assigned);
    if unassigned > 0 {
        println!();
        println!("{unassigned} unassigned context(s). Run `tessera migrate` to file them.");
    }
    Ok(())
}
