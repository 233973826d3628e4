//! # Recall Search
//!
//! Semantic retrieval over the vector store.
//!
//! ```text
//! query ──> Embedder::create_embedding ──> VectorStore::search(top_k, threshold)
//!                                              └─> ranked RetrievalResult
//! ```

mod error;
mod retriever;

pub use error::{Result, SearchError};
pub use recall_vector_store::RetrievalResult;
pub use retriever::{RetrievalConfig, Retriever};
