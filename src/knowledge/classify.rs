//! Classification strategies for migration.
//!
//! A [`Classifier`] decides where a legacy flat context belongs. Migration
//! only applies what it is handed; it never invents a target on its own.
//!
//! Two strategies ship with the crate:
//! - [`MappingClassifier`]: an explicit per-context table, usually loaded
//!   from a TOML file.
//! - [`TagClassifier`]: reads `project:<name>` / `sprint:<name>` tags.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::Context;

/// Where a context should be filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum HierarchyRef {
    /// By name. Missing nodes are created on first reference.
    Named {
        project: String,
        sprint: Option<String>,
    },
    /// By id. Nodes must already exist.
    Ids {
        project_id: Uuid,
        sprint_id: Option<Uuid>,
    },
}

impl HierarchyRef {
    pub fn named(project: impl Into<String>, sprint: Option<&str>) -> Self {
        Self::Named {
            project: project.into(),
            sprint: sprint.map(str::to_string),
        }
    }
}

impl std::fmt::Display for HierarchyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named { project, sprint: Some(sprint) } => write!(f, "{project} / {sprint}"),
            Self::Named { project, sprint: None } => f.write_str(project),
            Self::Ids { project_id, sprint_id: Some(sprint_id) } => {
                write!(f, "{project_id} / {sprint_id}")
            }
            Self::Ids { project_id, sprint_id: None } => write!(f, "{project_id}"),
        }
    }
}

/// Pluggable classification strategy.
pub trait Classifier: Send + Sync {
    /// `None` means "no target": the context is reported as unclassified.
    fn classify(&self, context: &Context) -> Option<HierarchyRef>;
}

impl<F> Classifier for F
where
    F: Fn(&Context) -> Option<HierarchyRef> + Send + Sync,
{
    fn classify(&self, context: &Context) -> Option<HierarchyRef> {
        self(context)
    }
}

// ── Mapping ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingFile {
    #[serde(default)]
    entry: Vec<MappingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingEntry {
    context_id: Uuid,
    project: Option<String>,
    project_id: Option<Uuid>,
    sprint: Option<String>,
    sprint_id: Option<Uuid>,
}

impl MappingEntry {
    fn into_ref(self) -> Result<(Uuid, HierarchyRef)> {
        let id = self.context_id;
        let target = match (self.project, self.project_id) {
            (Some(project), None) => {
                anyhow::ensure!(
                    self.sprint_id.is_none(),
                    "entry {id}: sprint_id requires project_id"
                );
                HierarchyRef::Named {
                    project,
                    sprint: self.sprint,
                }
            }
            (None, Some(project_id)) => {
                anyhow::ensure!(
                    self.sprint.is_none(),
                    "entry {id}: sprint name requires a project name"
                );
                HierarchyRef::Ids {
                    project_id,
                    sprint_id: self.sprint_id,
                }
            }
            (Some(_), Some(_)) => anyhow::bail!("entry {id}: give project or project_id, not both"),
            (None, None) => anyhow::bail!("entry {id}: missing project or project_id"),
        };
        Ok((id, target))
    }
}

/// Explicit `context id → target` table.
///
/// ```toml
/// [[entry]]
/// context_id = "0190d8c2-..."
/// project = "Apollo"
/// sprint = "Week 3"
///
/// [[entry]]
/// context_id = "0190d8c3-..."
/// project_id = "0190d8a0-..."
/// ```
#[derive(Debug, Clone, Default)]
pub struct MappingClassifier {
    entries: HashMap<Uuid, HierarchyRef>,
}

impl MappingClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the target for one context.
    pub fn insert(&mut self, context_id: Uuid, target: HierarchyRef) -> &mut Self {
        self.entries.insert(context_id, target);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the TOML mapping format shown above. Duplicate context ids are an error.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: MappingFile = toml::from_str(raw).context("failed to parse mapping TOML")?;
        let mut entries = HashMap::with_capacity(file.entry.len());
        for entry in file.entry {
            let (id, target) = entry.into_ref()?;
            anyhow::ensure!(
                entries.insert(id, target).is_none(),
                "context {id} is mapped more than once"
            );
        }
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read mapping file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid mapping file {}", path.display()))
    }
}

impl Classifier for MappingClassifier {
    fn classify(&self, context: &Context) -> Option<HierarchyRef> {
        self.entries.get(&context.id).cloned()
    }
}

// ── Tags ─────────────────────────────────────────────────────────────────────

/// Derives the target from prefixed tags, e.g. `project:Apollo` and
/// `sprint:Week 3`. The first matching tag of each kind wins; a context with
/// no project tag is unclassified even if it carries a sprint tag.
#[derive(Debug, Clone)]
pub struct TagClassifier {
    pub project_prefix: String,
    pub sprint_prefix: String,
}

impl Default for TagClassifier {
    fn default() -> Self {
        Self {
            project_prefix: "project:".into(),
            sprint_prefix: "sprint:".into(),
        }
    }
}

impl TagClassifier {
    pub fn with_prefixes(project_prefix: impl Into<String>, sprint_prefix: impl Into<String>) -> Self {
        Self {
            project_prefix: project_prefix.into(),
            sprint_prefix: sprint_prefix.into(),
        }
    }

    fn find<'a>(&self, context: &'a Context, prefix: &str) -> Option<&'a str> {
        context
            .tags
            .iter()
            .filter_map(|tag| tag.strip_prefix(prefix))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

impl Classifier for TagClassifier {
    fn classify(&self, context: &Context) -> Option<HierarchyRef> {
        let project = self.find(context, &self.project_prefix)?;
        let sprint = self.find(context, &self.sprint_prefix);
        Some(HierarchyRef::named(project, sprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::{ContextType, Tags};
    use chrono::Utc;

    fn ctx(tags: &[&str]) -> Context {
        let now = Utc::now();
        Context {
            id: Uuid::now_v7(),
            kind: ContextType::Text,
            content: "note".into(),
            embedding: None,
            tags: Tags::new(tags),
            project_id: None,
            sprint_id: None,
            related_links: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tag_classifier_reads_project_and_sprint() {
        let c = ctx(&["misc", "project: Apollo", "sprint:Week 3"]);
        assert_eq!(
            TagClassifier::default().classify(&c),
            Some(HierarchyRef::named("Apollo", Some("Week 3")))
        );
    }

    #[test]
    fn tag_classifier_requires_project_tag() {
        let c = ctx(&["sprint:Week 3"]);
        assert_eq!(TagClassifier::default().classify(&c), None);
        let blank = ctx(&["project:   "]);
        assert_eq!(TagClassifier::default().classify(&blank), None);
    }

    #[test]
    fn tag_classifier_custom_prefixes() {
        let c = ctx(&["p/Apollo", "s/W1"]);
        let classifier = TagClassifier::with_prefixes("p/", "s/");
        assert_eq!(classifier.classify(&c), Some(HierarchyRef::named("Apollo", Some("W1"))));
    }

    #[test]
    fn mapping_parses_named_and_id_entries() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let p = Uuid::now_v7();
        let raw = format!(
            r#"
[[entry]]
context_id = "{a}"
project = "Apollo"
sprint = "Week 1"

[[entry]]
context_id = "{b}"
project_id = "{p}"
"#
        );
        let mapping = MappingClassifier::from_toml_str(&raw).unwrap();
        assert_eq!(mapping.len(), 2);

        let mut ca = ctx(&[]);
        ca.id = a;
        assert_eq!(mapping.classify(&ca), Some(HierarchyRef::named("Apollo", Some("Week 1"))));

        let mut cb = ctx(&[]);
        cb.id = b;
        assert_eq!(
            mapping.classify(&cb),
            Some(HierarchyRef::Ids { project_id: p, sprint_id: None })
        );

        assert_eq!(mapping.classify(&ctx(&[])), None);
    }

    #[test]
    fn mapping_rejects_ambiguous_entries() {
        let id = Uuid::now_v7();
        let both = format!(
            "[[entry]]\ncontext_id = \"{id}\"\nproject = \"A\"\nproject_id = \"{}\"\n",
            Uuid::now_v7()
        );
        assert!(MappingClassifier::from_toml_str(&both).is_err());

        let neither = format!("[[entry]]\ncontext_id = \"{id}\"\n");
        assert!(MappingClassifier::from_toml_str(&neither).is_err());

        let duplicate = format!(
            "[[entry]]\ncontext_id = \"{id}\"\nproject = \"A\"\n\n[[entry]]\ncontext_id = \"{id}\"\nproject = \"B\"\n"
        );
        assert!(MappingClassifier::from_toml_str(&duplicate).is_err());
    }

    #[test]
    fn closures_are_classifiers() {
        let always = |_: &Context| Some(HierarchyRef::named("Inbox", None));
        assert_eq!(always.classify(&ctx(&[])), Some(HierarchyRef::named("Inbox", None)));
    }
}
