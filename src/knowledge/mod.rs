//! The knowledge engine: similarity linking and the Project → Sprint hierarchy.
//!
//! Everything in here is written against [`store::ContextStore`] and
//! [`crate::embedding::EmbeddingProvider`]; concrete adapters are injected by
//! the caller.

pub mod add;
pub mod classify;
pub mod hierarchy;
pub mod links;
pub mod migrate;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;
pub mod vector;
