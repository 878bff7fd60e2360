//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`]:
//!
//! | Version | Change |
//! |---------|--------|
//! | 1 | Flat `contexts` table |
//! | 2 | `projects`, `sprints`, and nullable `project_id` / `sprint_id` on contexts |
//! | 3 | Embedding model identifier in `schema_meta` |
//!
//! Moving existing rows into the hierarchy is a separate, data-level step
//! (`tessera migrate`); version 2 only makes room for it.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

const HIERARCHY_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sprints (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    sort_order INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(project_id, name)
);

CREATE INDEX IF NOT EXISTS idx_sprints_project ON sprints(project_id, sort_order);

ALTER TABLE contexts ADD COLUMN project_id TEXT REFERENCES projects(id) ON DELETE SET NULL;
ALTER TABLE contexts ADD COLUMN sprint_id TEXT REFERENCES sprints(id) ON DELETE SET NULL;

CREATE INDEX IF NOT EXISTS idx_contexts_project ON contexts(project_id);
"#;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the stored embedding model identifier, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set the stored embedding model identifier.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        let tx = conn.unchecked_transaction()?;
        match next {
            2 => migrate_v1_to_v2(&tx)?,
            3 => migrate_v2_to_v3(&tx)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }
        update_schema_version(&tx, next)?;
        tx.commit()?;

        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: hierarchy tables and assignment columns.
///
/// Legacy timestamps are rewritten to the canonical UTC form so that text
/// order on `created_at` is creation order.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(HIERARCHY_SQL)?;
    canonicalize_timestamps(conn)
}

fn canonicalize_timestamps(conn: &Connection) -> rusqlite::Result<()> {
    let rows: Vec<(String, String, String)> = conn
        .prepare("SELECT id, created_at, updated_at FROM contexts")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let mut rewritten = 0usize;
    for (id, created_at, updated_at) in rows {
        let (Some(created), Some(updated)) = (canonical_ts(&created_at), canonical_ts(&updated_at)) else {
            tracing::warn!(id = %id, created_at = %created_at, "unparseable legacy timestamp left as is");
            continue;
        };
        if created != created_at || updated != updated_at {
            conn.execute(
                "UPDATE contexts SET created_at = ?1, updated_at = ?2 WHERE id = ?3",
                [&created, &updated, &id],
            )?;
            rewritten += 1;
        }
    }
    if rewritten > 0 {
        tracing::info!(rows = rewritten, "normalized legacy timestamps");
    }
    Ok(())
}

fn canonical_ts(raw: &str) -> Option<String> {
    let parsed = chrono::DateTime::parse_from_rfc3339(raw).ok()?;
    Some(super::store::format_ts(&parsed.with_timezone(&chrono::Utc)))
}

/// Migration v2 → v3: record which model produced the stored vectors.
fn migrate_v2_to_v3(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('embedding_model', 'all-MiniLM-L6-v2')",
        [],
    )?;
    Ok(())
}
