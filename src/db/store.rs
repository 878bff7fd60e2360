//! [`ContextStore`] implementation backed by SQLite.
//!
//! Embeddings are stored as little-endian `f64` BLOBs, tags and related links
//! as JSON text, timestamps as fixed-width RFC 3339 strings so that text
//! ordering matches time ordering.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context as _, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::knowledge::store::{ContextStore, ListOptions, ProjectFilter};
use crate::knowledge::types::{Context, Project, RelatedLink, Sprint, Tags};

const CONTEXT_COLUMNS: &str = "id, type, content, embedding, tags, project_id, sprint_id, \
                               related_links, created_at, updated_at";

/// SQLite-backed store. The connection sits behind a `Mutex`, so writes from
/// one process are serialized.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open the database at `path` via [`crate::db::open_database`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(super::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(super::open_memory_database()?))
    }

    /// Run `f` with exclusive access to the underlying connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("db lock poisoned: {e}"))
    }
}

// ── Encoding helpers ─────────────────────────────────────────────────────────

/// Encode a vector as a BLOB of little-endian `f64` values.
pub fn embedding_to_blob(vec: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 8);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`embedding_to_blob`].
pub fn blob_to_embedding(blob: &[u8]) -> Result<Vec<f64>> {
    anyhow::ensure!(
        blob.len() % 8 == 0,
        "embedding blob length {} is not a multiple of 8",
        blob.len()
    );
    Ok(blob
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect())
}

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp: {raw}"))?
        .with_timezone(&Utc))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid id: {raw}"))
}

fn parse_opt_id(raw: Option<String>) -> Result<Option<Uuid>> {
    raw.as_deref().map(parse_id).transpose()
}

// ── Row structs ──────────────────────────────────────────────────────────────

struct ContextRow {
    id: String,
    kind: String,
    content: String,
    embedding: Option<Vec<u8>>,
    tags: String,
    project_id: Option<String>,
    sprint_id: Option<String>,
    related_links: String,
    created_at: String,
    updated_at: String,
}

impl ContextRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            content: row.get(2)?,
            embedding: row.get(3)?,
            tags: row.get(4)?,
            project_id: row.get(5)?,
            sprint_id: row.get(6)?,
            related_links: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_context(self) -> Result<Context> {
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .with_context(|| format!("invalid tags for context {}", self.id))?;
        let related_links: Vec<RelatedLink> = serde_json::from_str(&self.related_links)
            .with_context(|| format!("invalid related links for context {}", self.id))?;

        Ok(Context {
            id: parse_id(&self.id)?,
            kind: self.kind.parse().map_err(|e: String| anyhow!(e))?,
            content: self.content,
            embedding: self.embedding.as_deref().map(blob_to_embedding).transpose()?,
            tags: Tags::from(tags),
            project_id: parse_opt_id(self.project_id)?,
            sprint_id: parse_opt_id(self.sprint_id)?,
            related_links,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_project((id, name, created_at): (String, String, String)) -> Result<Project> {
    Ok(Project {
        id: parse_id(&id)?,
        name,
        created_at: parse_ts(&created_at)?,
    })
}

type SprintRow = (String, String, String, i64, String);

fn sprint_from_row(row: &Row<'_>) -> rusqlite::Result<SprintRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_sprint((id, project_id, name, order, created_at): SprintRow) -> Result<Sprint> {
    Ok(Sprint {
        id: parse_id(&id)?,
        project_id: parse_id(&project_id)?,
        name,
        order,
        created_at: parse_ts(&created_at)?,
    })
}

// ── ContextStore ─────────────────────────────────────────────────────────────

impl ContextStore for SqliteStore {
    fn get_context(&self, id: Uuid) -> Result<Option<Context>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {CONTEXT_COLUMNS} FROM contexts WHERE id = ?1"),
                params![id.to_string()],
                ContextRow::from_row,
            )
            .optional()?;
        row.map(ContextRow::into_context).transpose()
    }

    fn list_contexts(&self, options: &ListOptions) -> Result<Vec<Context>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        match options.project {
            ProjectFilter::Any => {}
            ProjectFilter::Unassigned => clauses.push("project_id IS NULL"),
            ProjectFilter::Project(id) => {
                clauses.push("project_id = ?");
                values.push(id.to_string());
            }
        }
        if let Some(sprint_id) = options.sprint_id {
            clauses.push("sprint_id = ?");
            values.push(sprint_id.to_string());
        }
        if let Some(kind) = options.kind {
            clauses.push("type = ?");
            values.push(kind.as_str().to_string());
        }

        let mut sql = format!("SELECT {CONTEXT_COLUMNS} FROM contexts");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), ContextRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        rows.into_iter().map(ContextRow::into_context).collect()
    }

    fn get_context_count(&self, project_id: Option<Uuid>) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = match project_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM contexts WHERE project_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM contexts", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn save_context(&self, context: &Context) -> Result<()> {
        let tags: Vec<String> = context.tags.clone().into();
        let tags_json = serde_json::to_string(&tags)?;
        let links_json = serde_json::to_string(&context.related_links)?;
        let embedding = context.embedding.as_deref().map(embedding_to_blob);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO contexts (id, type, content, embedding, tags, project_id, sprint_id, \
             related_links, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(id) DO UPDATE SET \
               type = excluded.type, content = excluded.content, embedding = excluded.embedding, \
               tags = excluded.tags, project_id = excluded.project_id, sprint_id = excluded.sprint_id, \
               related_links = excluded.related_links, created_at = excluded.created_at, \
               updated_at = excluded.updated_at",
            params![
                context.id.to_string(),
                context.kind.as_str(),
                context.content,
                embedding,
                tags_json,
                context.project_id.map(|id| id.to_string()),
                context.sprint_id.map(|id| id.to_string()),
                links_json,
                format_ts(&context.created_at),
                format_ts(&context.updated_at),
            ],
        )
        .with_context(|| format!("failed to save context {}", context.id))?;
        Ok(())
    }

    fn create_project(&self, project: &Project) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![project.id.to_string(), project.name, format_ts(&project.created_at)],
        )
        .with_context(|| format!("failed to create project {}", project.name))?;
        Ok(())
    }

    fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, created_at FROM projects WHERE id = ?1",
            params![id.to_string()],
            project_from_row,
        )
        .optional()?
        .map(into_project)
        .transpose()
    }

    fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, created_at FROM projects WHERE name = ?1",
            params![name],
            project_from_row,
        )
        .optional()?
        .map(into_project)
        .transpose()
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM projects ORDER BY name, id")?;
        let rows = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_project).collect()
    }

    fn create_sprint(&self, sprint: &Sprint) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sprints (id, project_id, name, sort_order, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sprint.id.to_string(),
                sprint.project_id.to_string(),
                sprint.name,
                sprint.order,
                format_ts(&sprint.created_at),
            ],
        )
        .with_context(|| format!("failed to create sprint {}", sprint.name))?;
        Ok(())
    }

    fn get_sprint(&self, id: Uuid) -> Result<Option<Sprint>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, project_id, name, sort_order, created_at FROM sprints WHERE id = ?1",
            params![id.to_string()],
            sprint_from_row,
        )
        .optional()?
        .map(into_sprint)
        .transpose()
    }

    fn find_sprint_by_name(&self, project_id: Uuid, name: &str) -> Result<Option<Sprint>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, project_id, name, sort_order, created_at FROM sprints \
             WHERE project_id = ?1 AND name = ?2",
            params![project_id.to_string(), name],
            sprint_from_row,
        )
        .optional()?
        .map(into_sprint)
        .transpose()
    }

    fn list_sprints(&self, project_id: Uuid) -> Result<Vec<Sprint>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, name, sort_order, created_at FROM sprints \
             WHERE project_id = ?1 ORDER BY sort_order, created_at, id",
        )?;
        let rows = stmt
            .query_map(params![project_id.to_string()], sprint_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_sprint).collect()
    }
}
