//! # Recall Vector Store
//!
//! Embedding client and durable vector storage for chunk retrieval.
//!
//! ## Pipeline
//!
//! ```text
//! chunks → Embedder (batches, timeout) → VectorStore::add_chunks
//!                                           │  redb `chunks` table
//!                                           └→ in-memory mirror ← search(query)
//! ```
//!
//! Search is exhaustive cosine scoring over the mirror; there is no ANN index.

pub mod embedding;
mod error;
mod similarity;
mod store;

pub use embedding::{
    Embedder, EmbedderConfig, EmbeddingProvider, HashingEmbeddingProvider,
    OpenAiEmbeddingProvider, ProviderConfig, ProviderKind,
};
pub use error::{Result, VectorStoreError};
pub use similarity::{cosine_similarity, normalize};
pub use store::{ReplaceSummary, RetrievalResult, StoreStats, VectorStore, SCHEMA_VERSION};
