//! Personal knowledge base core: similarity-linked contexts filed into a
//! Project → Sprint hierarchy.
//!
//! Tessera stores "contexts" (notes, meeting transcripts, documents, image
//! captions), embeds them locally, and links each new entry to its most
//! similar predecessors. Entries can be filed under a two-level hierarchy,
//! and a one-shot migration moves a legacy flat store into it.
//!
//! | Level | Unique within | Ordered by |
//! |-------|---------------|------------|
//! | **Project** | all projects | name |
//! | **Sprint** | its project | `order`, then creation time |
//!
//! # Architecture
//!
//! - **Engine**: [`knowledge`] is synchronous and written against the
//!   [`ContextStore`](knowledge::store::ContextStore) and
//!   [`EmbeddingProvider`](embedding::EmbeddingProvider) traits only
//! - **Storage**: SQLite via [`db::store::SqliteStore`]
//! - **Embeddings**: Local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Transport**: MCP over stdio or Streamable HTTP, plus a CLI
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite schema, schema migrations, the store adapter, and health checks
//! - [`embedding`]: text-to-vector embedding pipeline via ONNX Runtime
//! - [`error`]: the typed error taxonomy
//! - [`knowledge`]: linking, hierarchy, migration, add and search

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod knowledge;
