//! SQLite storage adapter.
//!
//! [`open_database`] prepares a connection (pragmas, schema, migrations) and
//! [`store::SqliteStore`] implements the engine's
//! [`ContextStore`](crate::knowledge::store::ContextStore) on top of it.

pub mod migrations;
pub mod schema;
pub mod store;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Open (or create) the database at the given path, with schema initialized
/// and all migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_millis(5000))?;

    prepare(&conn)?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a migrated in-memory database (tests and dry experiments).
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    schema::init_schema(conn).context("failed to initialize schema")?;
    migrations::run_migrations(conn).context("failed to run migrations")?;
    Ok(())
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub embedding_model: Option<String>,
    pub context_count: u64,
    pub unassigned_count: u64,
    pub project_count: u64,
    pub sprint_count: u64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run `PRAGMA integrity_check` and gather row counts.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    Ok(HealthReport {
        schema_version: migrations::get_schema_version(conn)?,
        embedding_model: migrations::get_embedding_model(conn)?,
        context_count: count("SELECT COUNT(*) FROM contexts")?,
        unassigned_count: count("SELECT COUNT(*) FROM contexts WHERE project_id IS NULL")?,
        project_count: count("SELECT COUNT(*) FROM projects")?,
        sprint_count: count("SELECT COUNT(*) FROM sprints")?,
        integrity_ok: integrity == "ok",
        integrity_details: integrity,
    })
}
