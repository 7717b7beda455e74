//! Embedding generation and storage for tours
//!
//! This module provides:
//! - the embedding client boundary and an OpenAI-compatible HTTP client
//! - PostgreSQL storage using pgvector, including schema management
//! - content hashing for change detection

mod client;
mod store;
mod types;

pub use client::{EmbeddingClient, EmbeddingError, OpenAiEmbedder, hash_content};
pub use store::{EmbeddingStore, PgEmbeddingStore, StoreSettings, TABLE_NAME, schema_statements};
pub use types::{EmbeddingInput, GeneratedEmbedding, HnswParams};
