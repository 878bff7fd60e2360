#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use tessera::db::store::SqliteStore;
use tessera::embedding::EmbeddingProvider;
use tessera::knowledge::store::ContextStore;
use tessera::knowledge::types::{Context, ContextType, Tags};
use uuid::Uuid;

/// Open a fresh in-memory store with schema and migrations applied.
pub fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

/// Generate a deterministic 384-dim embedding with a spike at position `seed`.
/// Each seed produces a distinct, orthogonal vector.
pub fn test_embedding(seed: u16) -> Vec<f64> {
    let mut v = vec![0.0; 384];
    v[seed as usize % 384] = 1.0;
    v
}

/// Unit vector whose cosine similarity with `test_embedding(seed)` is exactly `score`.
pub fn embedding_with_score(seed: u16, score: f64) -> Vec<f64> {
    let mut v = vec![0.0; 384];
    v[seed as usize % 384] = score;
    v[(seed as usize + 1) % 384] = (1.0 - score * score).max(0.0).sqrt();
    v
}

/// Fixed point in time `minutes` after 2024-01-01T00:00:00Z.
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        + Duration::minutes(minutes)
}

/// Insert a legacy flat context directly through the store. Returns its id.
pub fn insert_legacy(
    store: &dyn ContextStore,
    content: &str,
    tags: &[&str],
    embedding: Option<Vec<f64>>,
    minutes: i64,
) -> Uuid {
    let created_at = at_minute(minutes);
    let ctx = Context {
        id: Uuid::now_v7(),
        kind: ContextType::Text,
        content: content.to_string(),
        embedding,
        tags: Tags::new(tags),
        project_id: None,
        sprint_id: None,
        related_links: Vec::new(),
        created_at,
        updated_at: created_at,
    };
    store.save_context(&ctx).unwrap();
    ctx.id
}

/// Provider that returns a preset vector per exact text and fails otherwise.
pub struct TableEmbedder(pub Vec<(&'static str, Vec<f64>)>);

impl EmbeddingProvider for TableEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f64>> {
        self.0
            .iter()
            .find(|(key, _)| *key == text)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| anyhow::anyhow!("no vector for {text:?}"))
    }
}
