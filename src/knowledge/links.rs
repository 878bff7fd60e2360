//! Related-link selection.
//!
//! [`build_links`] scores a new embedding against a caller-supplied candidate
//! pool and keeps the best matches. It never touches storage; choosing the
//! pool (usually the contexts of the same project) is the caller's job.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{Context, RelatedLink};
use super::vector::checked_similarity;
use crate::error::{CoreError, CoreResult};

pub const DEFAULT_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MAX_LINKS: usize = 5;

/// Selection knobs. Both can be overridden per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    pub threshold: f64,
    pub max_links: usize,
}

impl LinkConfig {
    pub fn new(threshold: f64, max_links: usize) -> CoreResult<Self> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(CoreError::Validation(format!(
                "link threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            max_links,
        })
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

/// One entry of the candidate pool.
#[derive(Debug, Clone, Copy)]
pub struct LinkCandidate<'a> {
    pub id: Uuid,
    pub embedding: &'a [f64],
    /// Used to break score ties: newer candidates rank first.
    pub created_at: DateTime<Utc>,
}

impl<'a> LinkCandidate<'a> {
    /// Borrow a stored context as a candidate. `None` if it has no embedding.
    pub fn from_context(ctx: &'a Context) -> Option<Self> {
        ctx.embedding.as_deref().map(|embedding| Self {
            id: ctx.id,
            embedding,
            created_at: ctx.created_at,
        })
    }
}

/// Select and rank the related subset of `candidates`.
///
/// Candidates whose dimensionality differs from `new_embedding` are ignored,
/// scores below `config.threshold` are dropped, and the survivors are sorted
/// by score descending, then creation time descending, then id. A candidate id
/// that appears more than once is only linked once, with its best score.
/// An absent `new_embedding` yields no links.
pub fn build_links(
    new_embedding: Option<&[f64]>,
    candidates: &[LinkCandidate<'_>],
    config: &LinkConfig,
) -> Vec<RelatedLink> {
    let Some(query) = new_embedding else {
        return Vec::new();
    };
    if config.max_links == 0 {
        return Vec::new();
    }

    let mut best: HashMap<Uuid, (f64, DateTime<Utc>)> = HashMap::new();
    for candidate in candidates {
        let Some(score) = checked_similarity(query, candidate.embedding) else {
            continue;
        };
        if score < config.threshold {
            continue;
        }
        best.entry(candidate.id)
            .and_modify(|entry| {
                if score > entry.0 {
                    *entry = (score, candidate.created_at);
                }
            })
            .or_insert((score, candidate.created_at));
    }

    let mut ranked: Vec<(Uuid, f64, DateTime<Utc>)> = best
        .into_iter()
        .map(|(id, (score, created_at))| (id, score, created_at))
        .collect();

    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(config.max_links);

    ranked
        .into_iter()
        .map(|(target_id, score, _)| RelatedLink { target_id, score })
        .collect()
}

/// `true` if `links` are sorted non-increasing by score.
pub fn is_ranked(links: &[RelatedLink]) -> bool {
    links
        .windows(2)
        .all(|w| w[0].score.total_cmp(&w[1].score) != Ordering::Less)
}
