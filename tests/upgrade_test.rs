//! A version 1 (flat) database opened by the current binary keeps its rows,
//! leaves them unassigned, and can then be migrated into the hierarchy.

use rusqlite::Connection;
use tessera::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use tessera::db::store::SqliteStore;
use tessera::db::{check_database_health, schema};
use tessera::knowledge::classify::TagClassifier;
use tessera::knowledge::migrate::{migrate_contexts, MigrationOptions};
use tessera::knowledge::store::ContextStore;
use uuid::Uuid;

fn write_v1_database(path: &std::path::Path, rows: &[(Uuid, &str, &str)]) {
    let conn = Connection::open(path).unwrap();
    schema::init_schema(&conn).unwrap();
    for (id, content, tags) in rows {
        conn.execute(
            "INSERT INTO contexts (id, type, content, tags, created_at, updated_at) \
             VALUES (?1, 'text', ?2, ?3, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
            rusqlite::params![id.to_string(), content, tags],
        )
        .unwrap();
    }
    assert_eq!(get_schema_version(&conn).unwrap(), 1);
}

#[test]
fn v1_rows_survive_upgrade_unassigned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    let id = Uuid::now_v7();
    write_v1_database(&path, &[(id, "old note", r#"["misc"]"#)]);

    let store = SqliteStore::open(&path).unwrap();
    let ctx = store.get_context(id).unwrap().unwrap();
    assert_eq!(ctx.content, "old note");
    assert!(!ctx.is_assigned());
    assert!(ctx.tags.contains("misc"));
    assert!(ctx.related_links.is_empty());

    let report = store.with_connection(|conn| check_database_health(conn)).unwrap();
    assert_eq!(report.schema_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(report.unassigned_count, 1);
    assert!(report.integrity_ok);
}

#[test]
fn upgraded_rows_can_be_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    let tagged = Uuid::now_v7();
    let untagged = Uuid::now_v7();
    write_v1_database(
        &path,
        &[
            (tagged, "standup notes", r#"["project:Apollo","sprint:Week 1"]"#),
            (untagged, "grocery list", "[]"),
        ],
    );

    let store = SqliteStore::open(&path).unwrap();
    let result = migrate_contexts(
        &store,
        &TagClassifier::default(),
        &MigrationOptions::default(),
    )
    .unwrap();
    assert_eq!(result.migrated, 1);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].context_id, untagged);
    drop(store);

    // Reopening runs migrations again; nothing changes.
    let store = SqliteStore::open(&path).unwrap();
    let apollo = store.find_project_by_name("Apollo").unwrap().unwrap();
    let ctx = store.get_context(tagged).unwrap().unwrap();
    assert_eq!(ctx.project_id, Some(apollo.id));
    assert!(ctx.sprint_id.is_some());
    assert!(!store.get_context(untagged).unwrap().unwrap().is_assigned());
}

#[test]
fn legacy_offsets_migrate_in_creation_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    let later = Uuid::now_v7();
    let earlier = Uuid::now_v7();
    {
        let conn = Connection::open(&path).unwrap();
        schema::init_schema(&conn).unwrap();
        // 22:30Z on the previous day, written with an offset.
        conn.execute(
            "INSERT INTO contexts (id, type, content, tags, created_at, updated_at) \
             VALUES (?1, 'text', 'offset row', '[\"project:Apollo\"]', \
                     '2024-01-01T00:30:00+02:00', '2024-01-01T00:30:00+02:00')",
            [earlier.to_string()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO contexts (id, type, content, tags, created_at, updated_at) \
             VALUES (?1, 'text', 'utc row', '[\"project:Apollo\"]', \
                     '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
            [later.to_string()],
        )
        .unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let options = MigrationOptions {
        dry_run: true,
        ..Default::default()
    };
    let result = migrate_contexts(&store, &TagClassifier::default(), &options).unwrap();

    let order: Vec<Uuid> = result.outcomes.iter().map(|o| o.context_id).collect();
    assert_eq!(order, vec![earlier, later]);
    let first = store.get_context(earlier).unwrap().unwrap();
    let second = store.get_context(later).unwrap().unwrap();
    assert!(first.created_at < second.created_at);
}
