//! Flat → hierarchy migration.
//!
//! [`migrate_contexts`] walks every stored context in creation order and files
//! the unassigned ones under the target its [`Classifier`] names. Each context
//! moves `Pending → Processing → {Migrated | Skipped | Failed}`; the run itself
//! ends `Complete` or `Cancelled`.
//!
//! Already-assigned contexts are skipped, so re-running over the same corpus
//! makes no further changes. One context failing never aborts the batch: the
//! error is recorded in [`MigrationResult::failed`] and the walk continues.
//! There is no cross-context transaction, which also makes the run safe to
//! interrupt between contexts through [`MigrationOptions::cancel`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::classify::{Classifier, HierarchyRef};
use super::hierarchy::HierarchyService;
use super::links::{build_links, LinkCandidate, LinkConfig};
use super::store::{ContextStore, ListOptions};
use super::types::{validate_name, Context};
use crate::error::{CoreError, CoreResult};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Classify and validate everything, write nothing.
    pub dry_run: bool,
    /// Recompute related links of each migrated context within its new project.
    pub relink: bool,
    pub link_config: LinkConfig,
    /// Checked before each context; once set, the rest stay `Pending`.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Per-context state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    Pending,
    Processing,
    Migrated,
    Skipped,
    Failed,
}

/// Whole-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Complete,
    Cancelled,
}

/// Where a context was (or in a dry run, would be) filed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub project_id: Uuid,
    pub project: String,
    pub sprint_id: Option<Uuid>,
    pub sprint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextOutcome {
    pub context_id: Uuid,
    pub state: ContextState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedContext {
    pub context_id: Uuid,
    /// Typed reason string (the error's display form).
    pub reason: String,
    /// Machine-friendly error kind, see [`CoreError::kind`].
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: Vec<FailedContext>,
    pub dry_run: bool,
    /// Contexts not reached because the run was cancelled.
    pub pending: usize,
    pub projects_created: usize,
    pub sprints_created: usize,
    pub relinked: usize,
    pub state: RunState,
    /// One entry per context considered, in processing order.
    pub outcomes: Vec<ContextOutcome>,
}

impl MigrationResult {
    fn new(dry_run: bool) -> Self {
        Self {
            migrated: 0,
            skipped: 0,
            failed: Vec::new(),
            dry_run,
            pending: 0,
            projects_created: 0,
            sprints_created: 0,
            relinked: 0,
            state: RunState::Running,
            outcomes: Vec::new(),
        }
    }

    /// Number of contexts considered. Always equals
    /// `migrated + skipped + failed.len() + pending`.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    fn record(&mut self, context_id: Uuid, result: CoreResult<Step>) {
        let outcome = match result {
            Ok(Step::Skipped) => {
                self.skipped += 1;
                ContextOutcome {
                    context_id,
                    state: ContextState::Skipped,
                    placement: None,
                    reason: Some("already assigned".into()),
                }
            }
            Ok(Step::Migrated(placement)) => {
                self.migrated += 1;
                ContextOutcome {
                    context_id,
                    state: ContextState::Migrated,
                    placement: Some(placement),
                    reason: None,
                }
            }
            Err(e) => {
                tracing::warn!(id = %context_id, kind = e.kind(), error = %e, "context migration failed");
                let reason = e.to_string();
                self.failed.push(FailedContext {
                    context_id,
                    reason: reason.clone(),
                    kind: e.kind(),
                });
                ContextOutcome {
                    context_id,
                    state: ContextState::Failed,
                    placement: None,
                    reason: Some(reason),
                }
            }
        };
        tracing::debug!(id = %context_id, from = ?ContextState::Processing, to = ?outcome.state, "context state");
        self.outcomes.push(outcome);
    }

    fn record_pending(&mut self, context_id: Uuid) {
        self.pending += 1;
        self.outcomes.push(ContextOutcome {
            context_id,
            state: ContextState::Pending,
            placement: None,
            reason: None,
        });
    }
}

enum Step {
    Skipped,
    Migrated(Placement),
}

// ── Use case ─────────────────────────────────────────────────────────────────

/// Run one migration pass over the whole corpus.
///
/// Only a failure to list the corpus up front is returned as `Err`; every
/// per-context error lands in the result instead.
pub fn migrate_contexts(
    store: &dyn ContextStore,
    classifier: &dyn Classifier,
    options: &MigrationOptions,
) -> CoreResult<MigrationResult> {
    let contexts = store.list_contexts(&ListOptions::default())?;
    let hierarchy = HierarchyService::new(store);
    let mut plan = DryRunPlan::default();
    let mut result = MigrationResult::new(options.dry_run);

    tracing::info!(
        contexts = contexts.len(),
        dry_run = options.dry_run,
        relink = options.relink,
        "migration started"
    );

    for context in &contexts {
        if is_cancelled(options) {
            result.state = RunState::Cancelled;
        }
        if result.state == RunState::Cancelled {
            result.record_pending(context.id);
            continue;
        }

        tracing::debug!(id = %context.id, from = ?ContextState::Pending, to = ?ContextState::Processing, "context state");

        let step = if context.is_assigned() {
            Ok(Step::Skipped)
        } else if options.dry_run {
            plan_one(store, &hierarchy, classifier, context, &mut plan).map(Step::Migrated)
        } else {
            migrate_one(&hierarchy, classifier, context, &mut result).map(Step::Migrated)
        };

        if let Ok(Step::Migrated(placement)) = &step {
            if options.relink && !options.dry_run && relink(store, context.id, placement, &options.link_config) {
                result.relinked += 1;
            }
        }
        result.record(context.id, step);
    }

    if options.dry_run {
        result.projects_created = plan.projects.len();
        result.sprints_created = plan.sprints.len();
    }
    if result.state == RunState::Running {
        result.state = RunState::Complete;
    }

    tracing::info!(
        migrated = result.migrated,
        skipped = result.skipped,
        failed = result.failed.len(),
        pending = result.pending,
        projects_created = result.projects_created,
        sprints_created = result.sprints_created,
        state = ?result.state,
        dry_run = result.dry_run,
        "migration finished"
    );
    Ok(result)
}

fn is_cancelled(options: &MigrationOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

fn migrate_one(
    hierarchy: &HierarchyService<'_>,
    classifier: &dyn Classifier,
    context: &Context,
    result: &mut MigrationResult,
) -> CoreResult<Placement> {
    let target = classifier
        .classify(context)
        .ok_or(CoreError::Unclassified { context_id: context.id })?;

    let placement = match target {
        HierarchyRef::Named { project, sprint } => {
            let (project, created) = hierarchy.ensure_project(&project)?;
            result.projects_created += usize::from(created);
            let sprint = match sprint {
                Some(name) => {
                    let (sprint, created) = hierarchy.ensure_sprint(project.id, &name)?;
                    result.sprints_created += usize::from(created);
                    Some(sprint)
                }
                None => None,
            };
            Placement {
                project_id: project.id,
                project: project.name,
                sprint_id: sprint.as_ref().map(|s| s.id),
                sprint: sprint.map(|s| s.name),
            }
        }
        HierarchyRef::Ids { project_id, sprint_id } => {
            let target = hierarchy.resolve_target(project_id, sprint_id)?;
            Placement {
                project_id: target.project.id,
                project: target.project.name,
                sprint_id: target.sprint.as_ref().map(|s| s.id),
                sprint: target.sprint.map(|s| s.name),
            }
        }
    };

    hierarchy.assign_context(context.id, placement.project_id, placement.sprint_id)?;
    Ok(placement)
}

/// Hierarchy nodes a dry run would have created, so later contexts naming
/// the same project or sprint resolve to the same planned node.
#[derive(Default)]
struct DryRunPlan {
    projects: HashMap<String, Uuid>,
    sprints: HashMap<(Uuid, String), Uuid>,
}

fn plan_one(
    store: &dyn ContextStore,
    hierarchy: &HierarchyService<'_>,
    classifier: &dyn Classifier,
    context: &Context,
    plan: &mut DryRunPlan,
) -> CoreResult<Placement> {
    let target = classifier
        .classify(context)
        .ok_or(CoreError::Unclassified { context_id: context.id })?;

    match target {
        HierarchyRef::Named { project, sprint } => {
            let project = validate_name("project", &project)?;
            let project_id = match store.find_project_by_name(&project)? {
                Some(existing) => existing.id,
                None => *plan.projects.entry(project.clone()).or_insert_with(Uuid::now_v7),
            };

            let (sprint_id, sprint) = match sprint {
                Some(name) => {
                    let name = validate_name("sprint", &name)?;
                    let existing = store.find_sprint_by_name(project_id, &name)?;
                    let id = match existing {
                        Some(existing) => existing.id,
                        None => *plan
                            .sprints
                            .entry((project_id, name.clone()))
                            .or_insert_with(Uuid::now_v7),
                    };
                    (Some(id), Some(name))
                }
                None => (None, None),
            };

            Ok(Placement {
                project_id,
                project,
                sprint_id,
                sprint,
            })
        }
        HierarchyRef::Ids { project_id, sprint_id } => {
            let target = hierarchy.resolve_target(project_id, sprint_id)?;
            Ok(Placement {
                project_id: target.project.id,
                project: target.project.name,
                sprint_id: target.sprint.as_ref().map(|s| s.id),
                sprint: target.sprint.map(|s| s.name),
            })
        }
    }
}

/// Recompute the links of a freshly migrated context against its new
/// project. A failure here is logged; the assignment itself already stands.
fn relink(store: &dyn ContextStore, context_id: Uuid, placement: &Placement, config: &LinkConfig) -> bool {
    let outcome = (|| -> anyhow::Result<bool> {
        let Some(mut context) = store.get_context(context_id)? else {
            return Ok(false);
        };
        let Some(embedding) = context.embedding.clone() else {
            return Ok(false);
        };

        let pool = store.list_contexts(&ListOptions::in_project(placement.project_id))?;
        let candidates: Vec<LinkCandidate> = pool
            .iter()
            .filter(|c| c.id != context_id)
            .filter_map(LinkCandidate::from_context)
            .collect();

        context.related_links = build_links(Some(embedding.as_slice()), &candidates, config);
        context.updated_at = Utc::now();
        store.save_context(&context)?;
        Ok(true)
    })();

    match outcome {
        Ok(done) => done,
        Err(e) => {
            tracing::warn!(id = %context_id, error = %format!("{e:#}"), "relink failed");
            false
        }
    }
}
