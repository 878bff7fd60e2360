//! Core record definitions.
//!
//! Defines [`Context`] (a stored knowledge entry), [`ContextType`], the two
//! hierarchy levels [`Project`] and [`Sprint`], and the derived
//! [`RelatedLink`] edge. Invariants that can be checked without storage
//! (non-empty names, non-empty content, tag normalization) are enforced in the
//! constructors here; referential checks live in [`super::hierarchy`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// The kind of content a context entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Free-form note.
    Text,
    /// Meeting transcript.
    Meeting,
    /// Image with extracted or captioned text.
    Image,
    /// Imported document.
    Document,
}

impl ContextType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Meeting => "meeting",
            Self::Image => "image",
            Self::Document => "document",
        }
    }

    pub const ALL: [ContextType; 4] = [Self::Text, Self::Meeting, Self::Image, Self::Document];
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "meeting" => Ok(Self::Meeting),
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            _ => Err(format!("unknown context type: {s}")),
        }
    }
}

/// Insertion-ordered, duplicate-free set of tags.
///
/// Tags are trimmed and empty entries dropped; the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        Self(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags)
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

/// A directional similarity edge from the owning context to `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedLink {
    pub target_id: Uuid,
    /// Cosine similarity, never below the threshold it was selected with.
    pub score: f64,
}

/// A stored knowledge entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// UUID v7 (time-sortable) primary key.
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ContextType,
    pub content: String,
    /// Absent when no embedding provider was available at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f64>>,
    #[serde(default)]
    pub tags: Tags,
    pub project_id: Option<Uuid>,
    /// Only ever set together with a `project_id` that owns the sprint.
    pub sprint_id: Option<Uuid>,
    #[serde(default)]
    pub related_links: Vec<RelatedLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Context {
    /// `true` once the context has been filed under a project.
    pub fn is_assigned(&self) -> bool {
        self.project_id.is_some()
    }

    /// Short single-line preview for listings.
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.content.lines().next().unwrap_or_default();
        if first_line.chars().count() <= max_chars {
            first_line.to_string()
        } else {
            let truncated: String = first_line.chars().take(max_chars).collect();
            format!("{truncated}...")
        }
    }
}

/// Input for creating a context.
#[derive(Debug, Clone)]
pub struct NewContext {
    pub kind: ContextType,
    pub content: String,
    pub tags: Tags,
    pub project_id: Option<Uuid>,
    pub sprint_id: Option<Uuid>,
}

impl NewContext {
    pub fn new(kind: ContextType, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            tags: Tags::default(),
            project_id: None,
            sprint_id: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = Tags::new(tags);
        self
    }

    pub fn in_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn in_sprint(mut self, sprint_id: Uuid) -> Self {
        self.sprint_id = Some(sprint_id);
        self
    }

    /// Checks that need no storage access.
    pub fn validate(&self) -> CoreResult<()> {
        if self.content.trim().is_empty() {
            return Err(CoreError::Validation("content must not be empty".into()));
        }
        if self.sprint_id.is_some() && self.project_id.is_none() {
            return Err(CoreError::Validation(
                "a sprint can only be given together with its project".into(),
            ));
        }
        Ok(())
    }
}

/// Top level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// Unique across all projects, compared case-sensitively.
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: &str) -> CoreResult<Self> {
        Ok(Self {
            id: Uuid::now_v7(),
            name: validate_name("project", name)?,
            created_at: Utc::now(),
        })
    }
}

/// Second level of the hierarchy, always owned by exactly one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Unique among the sprints of `project_id`.
    pub name: String,
    /// Position among sibling sprints.
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl Sprint {
    pub fn new(project_id: Uuid, name: &str, order: i64) -> CoreResult<Self> {
        Ok(Self {
            id: Uuid::now_v7(),
            project_id,
            name: validate_name("sprint", name)?,
            order,
            created_at: Utc::now(),
        })
    }
}

/// Trim a hierarchy name and reject it if nothing is left.
pub fn validate_name(what: &str, name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{what} name must not be empty")));
    }
    Ok(trimmed.to_string())
}
