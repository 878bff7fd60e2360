//! SQL DDL for the base (version 1) layout.
//!
//! Version 1 is the legacy flat store: `contexts` without any hierarchy
//! columns, plus `schema_meta`. The hierarchy tables arrive through
//! [`super::migrations`]. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS contexts (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL CHECK(type IN ('text','meeting','image','document')),
    content TEXT NOT NULL,
    embedding BLOB,
    tags TEXT NOT NULL DEFAULT '[]',
    related_links TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contexts_created ON contexts(created_at, id);
CREATE INDEX IF NOT EXISTS idx_contexts_type ON contexts(type);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize the version 1 tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn schema_creates_flat_tables_only() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables = table_names(&conn);
        assert!(tables.contains(&"contexts".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
        assert!(!tables.contains(&"projects".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }
}
